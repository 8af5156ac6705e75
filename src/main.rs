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

use env_logger::Env;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;
use log::info;
use std::error::Error;

use gitlab_export::config::{self, Config};
use gitlab_export::dates::date_range;
use gitlab_export::export;
use gitlab_export::gitlab::{FetchMode, GitlabApi};

fn run(config: &Config, progress: &MultiProgress) -> Result<(), Box<dyn Error>> {
    // Configuration errors surface before any network traffic.
    let mode: FetchMode = config.fetch_mode.parse()?;
    let (start_date, end_date) = date_range(
        &config.time_range,
        config.start_date.as_deref(),
        config.end_date.as_deref(),
    )?;
    info!("Date range: from {} to {}", start_date, end_date);

    let api = GitlabApi::new(
        &config.gitlab_url,
        &config.gitlab_pat,
        config.strict,
        config.timeout,
    )?;

    match export(
        &api,
        progress,
        &start_date,
        &end_date,
        mode,
        &config.out_file,
    )? {
        None => info!("No issues found in the selected range, nothing to write"),
        Some(count) => info!("Wrote {} issues to {}", count, config.out_file.display()),
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let env = Env::new()
        .filter_or("RUST_LOG", "info")
        .write_style_or("LOG_STYLE", "always");

    // Route log lines through the progress handler so bars are not garbled.
    let logger = env_logger::Builder::from_env(env).build();
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;

    let config = config::generate()?;
    run(&config, &progress)
}
