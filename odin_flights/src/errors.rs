/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use thiserror::Error;

pub type Result<T> = std::result::Result<T,OdinFlightsError>;

#[derive(Error,Debug)]
pub enum OdinFlightsError {

    #[error("IO error {0}")]
    IOError( #[from] std::io::Error),

    #[error("RON error {0}")]
    RonError( #[from] ron::error::SpannedError),

    #[error("config error {0}")]
    ConfigError(String),

    #[error("fetch error {0}")]
    FetchError( #[from] FetchError),

    #[error("poll scheduler closed")]
    SchedulerClosed,

    #[error("operation failed {0}")]
    OpFailedError(String)
}

/// the failure modes of a single snapshot fetch. None of them is fatal - the poll scheduler logs them
/// and keeps the last known tracks
#[derive(Error,Debug,Clone,PartialEq)]
pub enum FetchError {

    #[error("network error {0}")]
    Network(String),

    #[error("bad response status {0}")]
    BadStatus(u16),

    #[error("malformed payload {0}")]
    MalformedPayload(String),
}

impl From<reqwest::Error> for FetchError {
    fn from (e: reqwest::Error)->Self {
        if let Some(status) = e.status() {
            FetchError::BadStatus( status.as_u16())
        } else if e.is_decode() {
            FetchError::MalformedPayload( e.to_string())
        } else {
            FetchError::Network( e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from (e: serde_json::Error)->Self {
        FetchError::MalformedPayload( e.to_string())
    }
}

macro_rules! op_failed {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinFlightsError::OpFailedError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use op_failed;

macro_rules! config_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        OdinFlightsError::ConfigError( format!( $fmt $(, $arg)* ))
    };
}
pub (crate) use config_error;
