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

use indicatif::{MultiProgress, ProgressBar};
use log::{debug, trace, warn};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const PAGE_SIZE: &str = "100";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Project {
    pub id: u64,
    pub path_with_namespace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: u64,
    pub author: User,
    pub created_at: String,

    // Fields the pipeline does not consume (body, system flag, ...) are
    // carried through so they end up in the export unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    pub iid: u64,
    pub project_id: u64,
    pub author: User,
    pub assignees: Option<Vec<User>>,
    pub created_at: String,
    pub updated_at: String,

    // Absent until the contribution filter attaches the discussion notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<Note>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// True when the user authored, is assigned to, or commented on the issue.
    /// Note authors are only visible after the notes have been attached.
    pub fn involves_user(&self, user_id: u64) -> bool {
        if self.author.id == user_id {
            return true;
        }
        if self.assignees.iter().flatten().any(|a| a.id == user_id) {
            return true;
        }
        self.notes
            .iter()
            .flatten()
            .any(|note| note.author.id == user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    MyIssues,
    AllContributions,
}

impl FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "my_issues" => Ok(FetchMode::MyIssues),
            "all_contributions" => Ok(FetchMode::AllContributions),
            other => Err(format!(
                "invalid fetch mode {:?}, expected my_issues or all_contributions",
                other
            )),
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::MyIssues => write!(f, "my_issues"),
            FetchMode::AllContributions => write!(f, "all_contributions"),
        }
    }
}

/// Id-keyed issue collection that remembers insertion order. Inserting an
/// issue that is already present replaces the record but keeps its original
/// position, so the final export order is the first-seen fetch order.
#[derive(Debug, Default)]
pub struct WorkingSet {
    order: Vec<u64>,
    issues: HashMap<u64, Issue>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, issue: Issue) {
        if !self.issues.contains_key(&issue.id) {
            self.order.push(issue.id);
        }
        self.issues.insert(issue.id, issue);
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Consumes the set into issues in insertion order.
    pub fn into_issues(mut self) -> Vec<Issue> {
        self.order
            .into_iter()
            .filter_map(|id| self.issues.remove(&id))
            .collect()
    }
}

pub struct GitlabApi {
    base_url: String,
    headers: HeaderMap,
    client: Client,
    strict: bool,
}

impl GitlabApi {
    pub fn new(
        base_url: &str,
        token: &str,
        strict: bool,
        timeout_secs: Option<u64>,
    ) -> Result<GitlabApi, Box<dyn Error>> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("gitlab-export"));
        headers.insert(
            HeaderName::from_static("private-token"),
            HeaderValue::from_str(token)?,
        );

        // No timeout unless one was requested on the command line.
        let client = Client::builder()
            .timeout(timeout_secs.map(Duration::from_secs))
            .build()?;

        Ok(GitlabApi {
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
            client,
            strict,
        })
    }

    /// Fetches every page of a paginated endpoint into a single sequence.
    ///
    /// Pages are 100 records long, starting from page 1; an empty page is the
    /// only terminal condition. A failed page request stops the pagination
    /// and returns whatever was accumulated so far, unless strict mode turns
    /// the truncation into an error.
    pub fn fetch_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, Box<dyn Error>> {
        let url = format!("{}/api/v4/{}", self.base_url, path);
        let mut records: Vec<T> = Vec::new();
        let mut page: u32 = 1;

        loop {
            trace!("GET {} page {}", url, page);

            let page_str = page.to_string();
            let response = self
                .client
                .get(&url)
                .headers(self.headers.clone())
                .query(params)
                .query(&[("per_page", PAGE_SIZE), ("page", page_str.as_str())])
                .send()?;

            if !response.status().is_success() {
                let status = response.status();
                if self.strict {
                    return Err(
                        format!("request for {} page {} failed: {}", path, page, status).into(),
                    );
                }
                warn!(
                    "Request for {} page {} failed: {}; keeping the {} records fetched so far",
                    path,
                    page,
                    status,
                    records.len()
                );
                break;
            }

            let batch: Vec<T> = response.json()?;
            if batch.is_empty() {
                break;
            }

            records.extend(batch);
            page += 1;
        }

        Ok(records)
    }

    /// Resolves the authenticated user. A failure here is fatal for the run.
    pub fn current_user(&self) -> Result<User, Box<dyn Error>> {
        let url = format!("{}/api/v4/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .headers(self.headers.clone())
            .send()?;

        if !response.status().is_success() {
            return Err(format!("failed to fetch user information: {}", response.status()).into());
        }

        let user: User = response.json()?;
        Ok(user)
    }

    /// Lists the projects the user has contributed to, in API order.
    pub fn contributed_projects(&self, user_id: u64) -> Result<Vec<Project>, Box<dyn Error>> {
        let path = format!("users/{}/contributed_projects", user_id);
        self.fetch_paginated(&path, &[])
    }

    /// Collects the issues relevant to the fetch mode from every project into
    /// a working set deduplicated by issue id.
    pub fn collect_issues(
        &self,
        progress: &MultiProgress,
        projects: &[Project],
        user_id: u64,
        start_date: &str,
        end_date: &str,
        mode: FetchMode,
    ) -> Result<WorkingSet, Box<dyn Error>> {
        let mut working_set = WorkingSet::new();
        let bar = progress.add(ProgressBar::new(projects.len() as u64));

        for project in projects {
            debug!(
                "Collecting issues from project {} ({})",
                project.id,
                project.path_with_namespace.as_deref().unwrap_or("?")
            );
            let path = format!("projects/{}/issues", project.id);

            match mode {
                FetchMode::MyIssues => {
                    // Assigned first, then authored; the union order is
                    // visible in the final export.
                    let assigned: Vec<Issue> = self.fetch_paginated(
                        &path,
                        &[
                            ("scope", "all".to_string()),
                            ("created_after", start_date.to_string()),
                            ("created_before", end_date.to_string()),
                            ("assignee_id", user_id.to_string()),
                        ],
                    )?;
                    for issue in assigned {
                        working_set.insert(issue);
                    }

                    let authored: Vec<Issue> = self.fetch_paginated(
                        &path,
                        &[
                            ("scope", "all".to_string()),
                            ("created_after", start_date.to_string()),
                            ("created_before", end_date.to_string()),
                            ("author_id", user_id.to_string()),
                        ],
                    )?;
                    for issue in authored {
                        working_set.insert(issue);
                    }
                }
                FetchMode::AllContributions => {
                    let updated: Vec<Issue> = self.fetch_paginated(
                        &path,
                        &[
                            ("scope", "all".to_string()),
                            ("updated_after", start_date.to_string()),
                            ("updated_before", end_date.to_string()),
                        ],
                    )?;
                    for issue in updated {
                        working_set.insert(issue);
                    }
                }
            }

            bar.inc(1);
        }

        bar.finish_and_clear();
        debug!("Collected {} issues", working_set.len());
        Ok(working_set)
    }

    /// Attaches the discussion notes to every collected issue and keeps the
    /// ones the user contributed to, preserving collection order.
    pub fn filter_contributions(
        &self,
        progress: &MultiProgress,
        working_set: WorkingSet,
        user_id: u64,
        mode: FetchMode,
    ) -> Result<Vec<Issue>, Box<dyn Error>> {
        let bar = progress.add(ProgressBar::new(working_set.len() as u64));
        let mut selected: Vec<Issue> = Vec::new();

        for mut issue in working_set.into_issues() {
            let path = format!("projects/{}/issues/{}/notes", issue.project_id, issue.iid);
            let notes: Vec<Note> = self.fetch_paginated(
                &path,
                &[
                    ("sort", "asc".to_string()),
                    ("order_by", "created_at".to_string()),
                ],
            )?;
            issue.notes = Some(notes);

            let keep = match mode {
                // Collection already restricted membership to the user.
                FetchMode::MyIssues => true,
                FetchMode::AllContributions => issue.involves_user(user_id),
            };

            if keep {
                selected.push(issue);
            } else {
                debug!(
                    "Issue {} has no contribution from user {}, skipping",
                    issue.id, user_id
                );
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        Ok(selected)
    }
}
