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



#[macro_use]
extern crate log;

pub mod dateparse;
pub mod hive;
pub mod oozie;
pub mod partition;
pub mod util;

pub use crate::partition::{
	HivePartition,
	PartitionError,
	SnapshotPeriod,
};
