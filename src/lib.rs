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

pub mod config;
pub mod dates;
pub mod gitlab;

use gitlab::{FetchMode, GitlabApi, Issue};
use indicatif::MultiProgress;
use log::info;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Writes the issues to the output path as a pretty-printed JSON array.
pub fn write_issues(path: &Path, issues: &[Issue]) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(issues)?;
    fs::write(path, json)?;
    Ok(())
}

/// Runs the full collection pipeline and writes the export file.
///
/// Returns the number of issues written, or `None` when the range held no
/// issues at all, in which case no file is created.
pub fn export(
    api: &GitlabApi,
    progress: &MultiProgress,
    start_date: &str,
    end_date: &str,
    mode: FetchMode,
    out_file: &Path,
) -> Result<Option<usize>, Box<dyn Error>> {
    let user = api.current_user()?;
    info!("Authenticated as user id {}", user.id);

    let projects = api.contributed_projects(user.id)?;
    info!("Found {} contributed projects", projects.len());

    let working_set =
        api.collect_issues(progress, &projects, user.id, start_date, end_date, mode)?;
    if working_set.is_empty() {
        return Ok(None);
    }

    let issues = api.filter_contributions(progress, working_set, user.id, mode)?;
    write_issues(out_file, &issues)?;
    Ok(Some(issues.len()))
}
