/*
 * gitlab-export
 *
 * Copyright (C) 2025 gitlab-export contributors
 * gitlab-export is free software; you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation; either version 2 of the License, or
 * (at your option) any later version.
 *
 * gitlab-export is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with gitlab-export.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use clap::Parser;
use console::Term;
use log::{debug, info};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Export GitLab issue activity for a time range to a JSON file")]
pub struct Opts {
    /// GitLab personal access token
    #[clap(long = "pat", env = "GITLAB_PAT", hide_env_values = true)]
    gitlab_pat: Option<String>,

    /// GitLab base URL, e.g. https://gitlab.com
    #[clap(long = "url", env = "GITLAB_URL")]
    gitlab_url: Option<String>,

    /// Output file name
    #[clap(long = "out", default_value = "gitlab_issues.json")]
    out_file: PathBuf,

    /// Time range for issues: week, month, year or custom
    #[clap(long = "range", default_value = "week")]
    time_range: String,

    /// Fetch mode: my_issues or all_contributions
    #[clap(long = "mode", default_value = "all_contributions")]
    fetch_mode: String,

    /// Range start in MM-DD-YYYY format, used with --range custom
    #[clap(long)]
    start_date: Option<String>,

    /// Range end in MM-DD-YYYY format, used with --range custom
    #[clap(long)]
    end_date: Option<String>,

    /// Fail instead of silently truncating when a page request fails
    #[clap(long)]
    strict: bool,

    /// Per-request timeout in seconds; requests wait forever when unset
    #[clap(long)]
    timeout: Option<u64>,
}

pub struct Config {
    pub gitlab_url: String,
    pub gitlab_pat: String,
    pub out_file: PathBuf,
    pub time_range: String,
    pub fetch_mode: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub strict: bool,
    pub timeout: Option<u64>,
}

/// Parses the command line and resolves the missing pieces, prompting for
/// the token and URL when they were given neither as flags nor environment
/// variables.
pub fn generate() -> Result<Config, Box<dyn Error>> {
    let opts = Opts::parse();
    debug!("Command line options parsed");

    let gitlab_url = resolve_url(opts.gitlab_url)?;
    let gitlab_pat = resolve_token(opts.gitlab_pat)?;

    let config = Config {
        gitlab_url: normalize_url(&gitlab_url),
        gitlab_pat,
        out_file: opts.out_file,
        time_range: opts.time_range,
        fetch_mode: opts.fetch_mode,
        start_date: opts.start_date,
        end_date: opts.end_date,
        strict: opts.strict,
        timeout: opts.timeout,
    };

    info!("Configuration:");
    info!("GitLab URL: {}", config.gitlab_url);
    info!("Output file: {}", config.out_file.display());
    info!("Time range: {}", config.time_range);
    info!("Fetch mode: {}", config.fetch_mode);

    Ok(config)
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Reads a token from the file `~/.gitlab-export/token`.
fn token_from_file() -> Option<String> {
    let token_path = dirs::home_dir()?.join(".gitlab-export").join("token");
    let token = std::fs::read_to_string(token_path).ok()?;
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn resolve_token(flag: Option<String>) -> Result<String, Box<dyn Error>> {
    if let Some(token) = flag {
        return Ok(token);
    }
    if let Some(token) = token_from_file() {
        debug!("Using the token from ~/.gitlab-export/token");
        return Ok(token);
    }

    let term = Term::stderr();
    term.write_str("Enter your GitLab personal access token: ")?;
    let token = term.read_secure_line()?;
    if token.trim().is_empty() {
        return Err("a GitLab personal access token is required".into());
    }
    Ok(token.trim().to_string())
}

fn resolve_url(flag: Option<String>) -> Result<String, Box<dyn Error>> {
    if let Some(url) = flag {
        return Ok(url);
    }

    let term = Term::stderr();
    term.write_str("Enter your GitLab URL (e.g. https://gitlab.com): ")?;
    let url = term.read_line()?;
    if url.trim().is_empty() {
        return Err("a GitLab URL is required".into());
    }
    Ok(url.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_url_strips_trailing_slashes_and_whitespace() {
        assert_eq!(normalize_url("https://gitlab.com/"), "https://gitlab.com");
        assert_eq!(normalize_url(" https://gitlab.com "), "https://gitlab.com");
        assert_eq!(normalize_url("https://gitlab.com"), "https://gitlab.com");
    }
}
