use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HomeDirError {
    #[error("{0} environment variable is not set")]
    EnvMissing(&'static str),
    #[error("home_dir must be an absolute path (after ~ expansion): {0}")]
    AbsoluteRequired(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(target_os = "windows")]
const HOME_VAR: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const HOME_VAR: &str = "HOME";

/// Resolve the server home directory.
///
/// A configured value may start with `~`, which expands to the user home;
/// the result must be absolute. Without a configured value the directory is
/// `<user home>/<default_subdir>` (`%APPDATA%` on Windows, `$HOME` elsewhere).
/// With `create` set, the directory is created when missing.
pub fn resolve_home_dir(
    config_home: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let user_home = std::env::var_os(HOME_VAR);
    let path = resolve_with(config_home, user_home, default_subdir)?;
    if create {
        fs::create_dir_all(&path)?;
    }
    Ok(path)
}

fn resolve_with(
    config_home: Option<String>,
    user_home: Option<OsString>,
    default_subdir: &str,
) -> Result<PathBuf, HomeDirError> {
    let home = || {
        user_home
            .clone()
            .map(PathBuf::from)
            .ok_or(HomeDirError::EnvMissing(HOME_VAR))
    };

    let Some(raw) = config_home else {
        return Ok(home()?.join(default_subdir));
    };

    let expanded = if raw == "~" {
        home()?
    } else if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        home()?.join(rest)
    } else {
        PathBuf::from(&raw)
    };

    if !expanded.is_absolute() {
        return Err(HomeDirError::AbsoluteRequired(
            expanded.to_string_lossy().into_owned(),
        ));
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_is_subdir_of_user_home() {
        let tmp = tempdir().unwrap();
        let got = resolve_with(None, Some(tmp.path().into()), ".jrpc").unwrap();
        assert_eq!(got, tmp.path().join(".jrpc"));
    }

    #[test]
    fn tilde_expands_to_user_home() {
        let tmp = tempdir().unwrap();
        let got = resolve_with(Some("~/srv".into()), Some(tmp.path().into()), ".jrpc").unwrap();
        assert_eq!(got, tmp.path().join("srv"));

        let got = resolve_with(Some("~".into()), Some(tmp.path().into()), ".jrpc").unwrap();
        assert_eq!(got, tmp.path());
    }

    #[test]
    fn relative_path_is_rejected() {
        let err = resolve_with(Some("relative/dir".into()), None, ".jrpc").unwrap_err();
        assert!(matches!(err, HomeDirError::AbsoluteRequired(_)));
    }

    #[test]
    fn missing_user_home_is_reported() {
        let err = resolve_with(None, None, ".jrpc").unwrap_err();
        assert!(matches!(err, HomeDirError::EnvMissing(_)));
    }

    #[test]
    fn absolute_path_is_created_on_request() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("nested").join("home");
        let got = resolve_home_dir(Some(target.to_string_lossy().into_owned()), ".jrpc", true)
            .unwrap();
        assert_eq!(got, target);
        assert!(target.is_dir());
    }
}
