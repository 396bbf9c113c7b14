// Single-resource commands: conda-env, conda-pkg, cran-pkg
pub mod ensure;

// Manifest reconciliation
pub mod apply;

pub mod doctor;

use std::process::ExitCode;

/// Exit status for a run that may have failed or been interrupted
pub fn exit_code(failed: bool) -> ExitCode {
    if crate::signal::interrupted() {
        ExitCode::from(130)
    } else if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(all(test, unix))]
pub(crate) mod testing {
    use crate::Context;
    use crate::config::Config;
    use pkgkit::exec::mock::MockRunner;
    use pkgkit::{Client, ExecContext, SearchEnv};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// A context whose conda and Rscript are fake executables in a temp dir
    /// and whose every command goes to a mock runner.
    pub struct Fixture {
        pub tmp: TempDir,
        pub bin: PathBuf,
        pub mock: Arc<MockRunner>,
        pub ctx: Context,
    }

    pub fn fixture(tools: &[&str]) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        for tool in tools {
            let path = bin.join(tool);
            fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let mock = Arc::new(MockRunner::new());
        let client = Client::with_context(ExecContext::new(mock.clone())).with_search_env(
            SearchEnv {
                path: Some(bin.clone().into_os_string()),
                home: Some(tmp.path().to_path_buf()),
                cwd: tmp.path().to_path_buf(),
            },
        );

        Fixture {
            ctx: Context {
                verbose: 0,
                quiet: true,
                json: false,
                check: false,
                config: Config::default(),
                client,
            },
            tmp,
            bin,
            mock,
        }
    }
}
