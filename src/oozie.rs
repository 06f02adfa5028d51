/* This file is part of refinery-rust.
 *
 * Copyright © 2023 refinery-rust contributors
 *
 * Licensed under the Mozilla Public License Version 2.0
 * Fedora-License-Identifier: MPLv2.0
 * SPDX-2.0-License-Identifier: MPL-2.0
 * SPDX-3.0-License-Identifier: MPL-2.0
 *
 * refinery-rust is free software.
 * For more information on the license, see LICENSE.
 * For more information on free software, see <https://www.gnu.org/philosophy/free-sw.en.html>.
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at <https://mozilla.org/MPL/2.0/>.
 */



//! Oozie coordinator and bundle "next date" inference.
//!
//! Works over job information as returned by Oozie's `/v2/job/<id>` endpoint. Fetching it
//! is left to a `JobInfoSource`.

use chrono::{
	DateTime,
	NaiveDateTime,
};
use serde::{
	de::DeserializeOwned,
	Deserialize,
};
use std::{
	collections::HashMap,
	fs,
	io,
	path::Path,
};

/// Number of coordinator actions requested per page.
pub const ACTIONS_PAGE_SIZE: u64 = 100;

/// Oozie job and action statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
	Waiting,
	Ready,
	Submitted,
	Running,
	Suspended,
	Timedout,
	Succeeded,
	Killed,
	Failed,
	#[serde(other)]
	Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorAction {
	pub status: JobStatus,
	/// Oozie formatted time, e.g. `Tue, 03 Jan 2023 00:00:00 GMT`
	pub nominal_time: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorInfo {
	#[serde(default)]
	pub coord_job_id: Option<String>,
	/// Total number of materialized actions, regardless of how many are in `actions`
	pub total: u64,
	pub start_time: String,
	#[serde(default)]
	pub next_materialized_time: Option<String>,
	/// Page of actions, in materialization order
	#[serde(default)]
	pub actions: Vec<CoordinatorAction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleCoordJob {
	pub coord_job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
	#[serde(default)]
	pub bundle_coord_jobs: Vec<BundleCoordJob>,
}

/// Parses an Oozie formatted time (`%a, %d %b %Y %H:%M:%S %Z`) into UTC.
pub fn parse_oozie_time(s: &str) -> Result<NaiveDateTime, String> {
	DateTime::parse_from_rfc2822(s)
		.map(|t| t.naive_utc())
		.map_err(|e| format!("Could not parse Oozie time {:?}: {}", s, e))
}

/// Source of Oozie job information
pub trait JobInfoSource {
	/// Gets a coordinator's information with up to `len` of its actions, starting at the
	/// 1-based action `offset`. An offset of 0 is treated as 1.
	fn coordinator_info(
		&mut self,
		coord_id: &str,
		offset: u64,
		len: u64,
	) -> Result<CoordinatorInfo, String>;

	/// Gets a bundle's information
	fn bundle_info(&mut self, bundle_id: &str) -> Result<BundleInfo, String>;
}

/// Reads a JSON document saved from the Oozie API.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
	let reader = io::BufReader::new(
		fs::File::open(path).map_err(|e| format!("Could not read {}: {}", path.display(), e))?,
	);
	serde_json::from_reader(reader).map_err(|e| format!("Could not parse {}: {}", path.display(), e))
}

/// Job information held in memory, e.g. loaded from saved API responses.
///
/// Coordinators must be stored with all of their actions.
#[derive(Debug, Clone, Default)]
pub struct StaticJobInfo {
	coordinators: HashMap<String, CoordinatorInfo>,
	bundles: HashMap<String, BundleInfo>,
}
impl StaticJobInfo {
	pub fn new() -> Self {
		Default::default()
	}

	pub fn add_coordinator(&mut self, coord_id: String, info: CoordinatorInfo) {
		self.coordinators.insert(coord_id, info);
	}

	pub fn add_bundle(&mut self, bundle_id: String, info: BundleInfo) {
		self.bundles.insert(bundle_id, info);
	}
}
impl JobInfoSource for StaticJobInfo {
	fn coordinator_info(
		&mut self,
		coord_id: &str,
		offset: u64,
		len: u64,
	) -> Result<CoordinatorInfo, String> {
		let info = self
			.coordinators
			.get(coord_id)
			.ok_or_else(|| format!("Unknown coordinator: {}", coord_id))?;
		let actions = info
			.actions
			.iter()
			.skip(offset.saturating_sub(1) as usize)
			.take(len as usize)
			.cloned()
			.collect();
		Ok(CoordinatorInfo {
			coord_job_id: info.coord_job_id.clone(),
			total: info.total,
			start_time: info.start_time.clone(),
			next_materialized_time: info.next_materialized_time.clone(),
			actions,
		})
	}

	fn bundle_info(&mut self, bundle_id: &str) -> Result<BundleInfo, String> {
		self.bundles
			.get(bundle_id)
			.cloned()
			.ok_or_else(|| format!("Unknown bundle: {}", bundle_id))
	}
}

/// Finds the next date a coordinator needs to run.
///
/// Walks the actions from newest to oldest and returns the oldest action not yet
/// succeeded that is newer than the newest succeeded one. If the newest action has
/// succeeded, that is the coordinator's next materialized time; if nothing has succeeded,
/// the oldest action. A coordinator without actions starts at its start time.
///
/// `coord_info` saves a request when the caller already has the coordinator's information.
pub fn coordinator_next_date<S: JobInfoSource + ?Sized>(
	source: &mut S,
	coord_id: &str,
	coord_info: Option<CoordinatorInfo>,
) -> Result<NaiveDateTime, String> {
	let coord_info = match coord_info {
		Some(info) => info,
		None => source.coordinator_info(coord_id, 0, 0)?,
	};
	if coord_info.total == 0 {
		return parse_oozie_time(&coord_info.start_time);
	}

	let next_materialized = || -> Result<NaiveDateTime, String> {
		let time = coord_info.next_materialized_time.as_ref().ok_or_else(|| {
			format!("Coordinator {} has no next materialized time", coord_id)
		})?;
		parse_oozie_time(time)
	};

	let mut offset = coord_info.total;
	let mut result = None;
	let mut prev_date = None;
	while result.is_none() && offset > 0 {
		offset = (offset + 1).saturating_sub(ACTIONS_PAGE_SIZE);
		debug!(
			"Reading actions of coordinator {} from offset {}",
			coord_id, offset
		);
		let page = source.coordinator_info(coord_id, offset, ACTIONS_PAGE_SIZE)?;

		let mut actions = page
			.actions
			.iter()
			.map(|action| {
				let date = parse_oozie_time(&action.nominal_time)?;
				Ok((date, action.status == JobStatus::Succeeded))
			})
			.collect::<Result<Vec<_>, String>>()?;
		actions.sort_by(|a, b| b.0.cmp(&a.0));

		if actions.is_empty() && prev_date.is_none() {
			result = Some(next_materialized()?);
		}
		for &(date, succeeded) in actions.iter() {
			if succeeded {
				result = Some(match prev_date {
					Some(d) => d,
					None => next_materialized()?,
				});
				break;
			}
			prev_date = Some(date);
		}
	}

	result
		.or(prev_date)
		.ok_or_else(|| format!("Could not determine next action to run for coord {}", coord_id))
}

/// Finds the next date a bundle needs to run: the earliest next date of its coordinators.
pub fn bundle_next_date<S: JobInfoSource + ?Sized>(
	source: &mut S,
	bundle_id: &str,
) -> Result<NaiveDateTime, String> {
	let bundle_info = source.bundle_info(bundle_id)?;
	let mut result: Option<NaiveDateTime> = None;
	for coord in bundle_info.bundle_coord_jobs.iter() {
		let next_date = coordinator_next_date(source, &coord.coord_job_id, None)?;
		debug!(
			"Coordinator {} of bundle {} next date: {}",
			coord.coord_job_id, bundle_id, next_date
		);
		result = Some(match result {
			Some(d) if d <= next_date => d,
			_ => next_date,
		});
	}
	result.ok_or_else(|| format!("Could not determine next action to run for bundle {}", bundle_id))
}
