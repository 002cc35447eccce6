use tracing::info;

use crate::settings::{IoSettings, RunSettings};

/// Whether a previous run left behind a split plan this run can pick up.
///
/// Resuming needs the resume flag and the working scene file from the
/// earlier run. Chunk files may additionally be sitting under the split
/// directory; their completeness is the downstream encoder's concern, so
/// only the flag is passed along.
pub fn should_resume(run: &RunSettings, io: &IoSettings) -> bool {
    if !run.resume {
        return false;
    }

    let scene_file = io.working_scene_file();
    if !scene_file.exists() {
        info!(
            "resume was set but {} does not exist, starting from scratch",
            scene_file.display()
        );
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn io_in(temp: &TempDir) -> IoSettings {
        IoSettings {
            input: temp.path().join("input.mkv"),
            temp:  temp.path().to_path_buf(),
        }
    }

    #[test]
    fn does_not_resume_without_the_flag() {
        let temp = TempDir::new().unwrap();
        let io = io_in(&temp);
        std::fs::write(io.working_scene_file(), "{\"scenes\": []}").unwrap();

        let run = RunSettings {
            resume:  false,
            sc_only: false,
        };
        assert!(!should_resume(&run, &io));
    }

    #[test]
    fn does_not_resume_without_a_scene_file() {
        let temp = TempDir::new().unwrap();
        let run = RunSettings {
            resume:  true,
            sc_only: false,
        };
        assert!(!should_resume(&run, &io_in(&temp)));
    }

    #[test]
    fn resumes_when_flag_and_scene_file_are_present() {
        let temp = TempDir::new().unwrap();
        let io = io_in(&temp);
        std::fs::write(io.working_scene_file(), "{\"scenes\": [100]}").unwrap();

        let run = RunSettings {
            resume:  true,
            sc_only: false,
        };
        assert!(should_resume(&run, &io));
    }
}
