//! Run configuration: assembly from CLI/env arguments and startup
//! validation. Validation failures are fatal before the loop begins.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use miette::{Result, miette};

use everyframe_catalog::MovieSource;

/// Email alert settings; present only when alerts are enabled.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub to: String,
}

/// Validated daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Movies in posting order; ids are 1-based positions.
    pub movies: Vec<MovieSource>,
    /// Default posting interval in seconds; the state file's `tweetDelay`
    /// wins once that file exists.
    pub interval: u64,
    /// Fixed hashtag block appended to every caption.
    pub hashtags: String,
    pub state_file: PathBuf,
    /// Restore all cursors to the start before running.
    pub reset: bool,
    /// Pause after an unexpected posting error before resuming.
    pub cooldown: Duration,
    pub platform_url: String,
    pub platform_token: String,
    pub email: Option<EmailConfig>,
}

impl Config {
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        movie_specs: &[String],
        state_file: PathBuf,
        interval: u64,
        hashtags: String,
        platform_url: String,
        platform_token: String,
        reset: bool,
        cooldown: u64,
        email_enabled: bool,
        email_api_url: Option<String>,
        email_api_key: Option<String>,
        email_from: Option<String>,
        email_to: Option<String>,
    ) -> Result<Self> {
        if movie_specs.is_empty() {
            return Err(miette!("at least one --movie is required"));
        }
        if interval < 1 {
            return Err(miette!("--interval must be at least 1 second"));
        }
        if platform_url.is_empty() {
            return Err(miette!("--platform-url must not be empty"));
        }

        let movies = parse_movie_specs(movie_specs)?;

        let email = if email_enabled {
            Some(EmailConfig {
                api_url: email_api_url
                    .ok_or_else(|| miette!("--email-api-url is required with --email-enabled"))?,
                api_key: email_api_key
                    .ok_or_else(|| miette!("--email-api-key is required with --email-enabled"))?,
                from: email_from
                    .ok_or_else(|| miette!("--email-from is required with --email-enabled"))?,
                to: email_to
                    .ok_or_else(|| miette!("--email-to is required with --email-enabled"))?,
            })
        } else {
            None
        };

        Ok(Self {
            movies,
            interval,
            hashtags,
            state_file,
            reset,
            cooldown: Duration::from_secs(cooldown),
            platform_url,
            platform_token,
            email,
        })
    }
}

/// Parse `NAME=DIR` or bare `DIR` movie specs into ordered sources.
///
/// Ids are assigned from position (1-based); a bare `DIR` takes its caption
/// name from the directory's file name.
pub fn parse_movie_specs(specs: &[String]) -> Result<Vec<MovieSource>> {
    let mut movies = Vec::with_capacity(specs.len());
    let mut roots = HashSet::new();

    for (index, spec) in specs.iter().enumerate() {
        let id = index as u32 + 1;
        let (name, root) = match spec.split_once('=') {
            Some((name, dir)) if !name.is_empty() => (name.to_string(), PathBuf::from(dir)),
            _ => {
                let root = PathBuf::from(spec);
                let name = root
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        miette!("cannot derive a movie name from path '{}'", spec)
                    })?;
                (name, root)
            }
        };

        if root.as_os_str().is_empty() {
            return Err(miette!("movie spec '{}' has an empty directory", spec));
        }
        if !roots.insert(root.clone()) {
            return Err(miette!(
                "movie directory '{}' is configured twice",
                root.display()
            ));
        }

        movies.push(MovieSource { id, name, root });
    }

    Ok(movies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn specs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_dir_takes_name_from_path() {
        let movies = parse_movie_specs(&specs(&["/frames/The Matrix (1999)"])).unwrap();

        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].id, 1);
        assert_eq!(movies[0].name, "The Matrix (1999)");
    }

    #[test]
    fn named_specs_and_positional_ids() {
        let movies =
            parse_movie_specs(&specs(&["First Film=/a", "Second Film=/b"])).unwrap();

        assert_eq!(movies[0].id, 1);
        assert_eq!(movies[0].name, "First Film");
        assert_eq!(movies[1].id, 2);
        assert_eq!(movies[1].root, PathBuf::from("/b"));
    }

    #[test]
    fn duplicate_directories_are_rejected() {
        assert!(parse_movie_specs(&specs(&["/a", "Other=/a"])).is_err());
    }

    #[test]
    fn email_settings_required_when_enabled() {
        let result = Config::build(
            &specs(&["/frames"]),
            PathBuf::from("state.json"),
            1800,
            String::new(),
            "https://platform.example".into(),
            "token".into(),
            false,
            540,
            true,
            None,
            None,
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn minimal_valid_config() {
        let config = Config::build(
            &specs(&["/frames"]),
            PathBuf::from("state.json"),
            1800,
            "#bot".into(),
            "https://platform.example".into(),
            "token".into(),
            false,
            540,
            false,
            None,
            None,
            None,
            None,
        )
        .unwrap();

        assert_eq!(config.movies.len(), 1);
        assert!(config.email.is_none());
        assert_eq!(config.cooldown, Duration::from_secs(540));
    }
}
