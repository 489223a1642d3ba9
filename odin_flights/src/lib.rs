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

///! live aircraft tracks for a selectable region: periodic snapshots are reconciled into a persistent
///! track table that drives shapes on a map display (create, rotate, glide, remove), with click-to-inspect

use std::{env, fs, path::{Path,PathBuf}, time::Duration};
use serde::{Serialize,Deserialize,de::DeserializeOwned};
use tracing::{debug,info};

pub mod errors;
pub mod region;
pub mod record;
pub mod display;
pub mod motion;
pub mod store;
pub mod reconcile;
pub mod inspect;
pub mod fetch;
pub mod simulated;
pub mod scheduler;

pub use errors::{OdinFlightsError,FetchError,Result};
pub use region::{GeoPos,BoundingBox,Region,RegionQuery};
pub use record::{EntityRecord,NormalizedEntityState,SkipCounts,normalize_batch,NO_LABEL};
pub use display::{DisplayAdapter,MapView,HandleId,ScreenPoint,UiEvent,WebMercatorView,HeadlessDisplay,DisplayOp};
pub use motion::{MotionInterpolator,Transition};
pub use store::{Track,TrackMetadata,TrackStore};
pub use reconcile::{ReconciliationEngine,ReconciliationReport};
pub use inspect::{DisplayPayload,DisplayUnits,InspectionSurface,describe};
pub use fetch::{SnapshotFetcher,Provider,MissingBatchPolicy,LiveFetcher,create_fetcher,parse_snapshot};
pub use simulated::SimulatedFetcher;
pub use scheduler::{PollScheduler,PollSchedulerHandle,PollMsg,SchedulerStats};

use errors::config_error;
use motion::{MIN_TRANSITION_RATIO,MAX_TRANSITION_RATIO};

/* #region config ****************************************************************************************/

pub const DEFAULT_CONFIG: &str = "flights.ron";
pub const CONFIG_DIR_ENV: &str = "ODIN_FLIGHTS_CONFIG_DIR";

const EMBEDDED_CONFIG: &str = include_str!("../configs/flights.ron");

#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct FlightsConfig {
    pub regions: Vec<Region>,
    pub provider: Provider,
    pub poll_interval: Duration,

    /// fraction of the poll interval used for motion transitions
    #[serde(default="default_transition_ratio")]
    pub transition_ratio: f64,

    #[serde(default="default_request_timeout")]
    pub request_timeout: Duration,

    #[serde(default="default_inspection_timeout")]
    pub inspection_timeout: Duration,

    #[serde(default)]
    pub display_units: DisplayUnits,

    #[serde(default)]
    pub missing_batch: MissingBatchPolicy,

    #[serde(default)]
    pub max_retries: usize,

    #[serde(default="default_retry_delay")]
    pub retry_delay: Duration,

    /// (width,height) of the map viewport in pixels
    #[serde(default="default_view_size")]
    pub view_size: (f64,f64),
}

fn default_transition_ratio ()->f64 { 0.9 }
fn default_request_timeout ()->Duration { Duration::from_secs(8) }
fn default_inspection_timeout ()->Duration { Duration::from_secs(5) }
fn default_retry_delay ()->Duration { Duration::from_secs(2) }
fn default_view_size ()->(f64,f64) { (1024.0, 768.0) }

impl FlightsConfig {
    pub fn validate (&self)->Result<()> {
        if self.regions.is_empty() {
            return Err( config_error!("no regions configured"))
        }
        if let Some(r) = self.regions.iter().find( |r| !r.bbox.is_valid() || !r.center.is_valid()) {
            return Err( config_error!("invalid geometry for region {}", r.name))
        }
        if self.poll_interval.is_zero() {
            return Err( config_error!("poll interval has to be > 0"))
        }
        if !(MIN_TRANSITION_RATIO..=MAX_TRANSITION_RATIO).contains( &self.transition_ratio) {
            return Err( config_error!("transition ratio {} outside of [{},{}]", self.transition_ratio, MIN_TRANSITION_RATIO, MAX_TRANSITION_RATIO))
        }
        if self.view_size.0 <= 0.0 || self.view_size.1 <= 0.0 {
            return Err( config_error!("view size has to be positive"))
        }
        Ok(())
    }

    /// look up a region either by its index or by its (case insensitive) name
    pub fn region_index (&self, key: &str)->Option<usize> {
        if let Ok(idx) = key.parse::<usize>() {
            return if idx < self.regions.len() { Some(idx) } else { None }
        }
        self.regions.iter().position( |r| r.name.eq_ignore_ascii_case( key))
    }

    pub fn interpolator (&self)->MotionInterpolator {
        MotionInterpolator::for_poll_interval( self.poll_interval, self.transition_ratio)
    }

    /// a reconciliation engine with a map view fitted to the first configured region
    pub fn create_engine<D> (&self, display: D)->Result<ReconciliationEngine<WebMercatorView,D>> where D: DisplayAdapter {
        let region = self.regions.first().ok_or_else( || config_error!("no regions configured"))?;
        let map = WebMercatorView::new( self.view_size.0, self.view_size.1, &region.bbox);
        Ok( ReconciliationEngine::new( map, display, self.interpolator()))
    }
}

/// find a config file: `$ODIN_FLIGHTS_CONFIG_DIR`, `./configs`, then the configs dir of this crate
pub fn find_config_file (filename: &str)->Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::with_capacity(3);
    if let Ok(dir) = env::var( CONFIG_DIR_ENV) { dirs.push( PathBuf::from( dir)) }
    dirs.push( PathBuf::from("configs"));
    dirs.push( Path::new( env!("CARGO_MANIFEST_DIR")).join("configs"));

    dirs.into_iter().map( |d| d.join( filename)).find( |p| p.is_file())
}

/// load a RON config by filename. Falls back to the embedded default for [`DEFAULT_CONFIG`]
pub fn load_config<C> (filename: &str)->Result<C> where C: DeserializeOwned {
    if let Some(path) = find_config_file( filename) {
        return load_config_from( &path)
    }

    if filename == DEFAULT_CONFIG {
        info!("using embedded {}", DEFAULT_CONFIG);
        Ok( ron::from_str( EMBEDDED_CONFIG)?)
    } else {
        Err( config_error!("config file {} not found", filename))
    }
}

pub fn load_config_from<C> (path: &Path)->Result<C> where C: DeserializeOwned {
    debug!("loading config {:?}", path);
    let contents = fs::read_to_string( path)?;
    Ok( ron::from_str( &contents)?)
}

/// load and validate a [`FlightsConfig`]
pub fn load_flights_config (path: Option<&Path>)->Result<FlightsConfig> {
    let config: FlightsConfig = match path {
        Some(path) => load_config_from( path)?,
        None => load_config( DEFAULT_CONFIG)?
    };
    config.validate()?;
    Ok(config)
}

/* #endregion config */
