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

use std::{collections::{HashMap,HashSet}, fmt, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug,warn};

use crate::{
    display::{DisplayAdapter,MapView},
    motion::MotionInterpolator,
    record::NormalizedEntityState,
    region::BoundingBox,
    store::{Track,TrackMetadata,TrackStore}
};

/// what changed in one reconciliation. Ids are listed in processing order
#[derive(Debug,Clone,Default,PartialEq)]
pub struct ReconciliationReport {
    pub created: Vec<Arc<str>>,
    pub updated: Vec<Arc<str>>,
    pub removed: Vec<Arc<str>>,
}

impl ReconciliationReport {
    pub fn is_empty (&self)->bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

impl fmt::Display for ReconciliationReport {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "created: {}, updated: {}, removed: {}", self.created.len(), self.updated.len(), self.removed.len())
    }
}

/// owns the track table of one region/view and keeps it in sync with incoming batches, driving shape
/// creation, rotation, motion and removal on the display
pub struct ReconciliationEngine<M,D> where M: MapView, D: DisplayAdapter {
    store: TrackStore,
    map: M,
    display: D,
    interpolator: MotionInterpolator,
}

impl<M,D> ReconciliationEngine<M,D> where M: MapView, D: DisplayAdapter {
    pub fn new (map: M, display: D, interpolator: MotionInterpolator)->Self {
        ReconciliationEngine { store: TrackStore::new(), map, display, interpolator }
    }

    pub fn store (&self)->&TrackStore { &self.store }
    pub fn display (&self)->&D { &self.display }
    pub fn display_mut (&mut self)->&mut D { &mut self.display }
    pub fn map (&self)->&M { &self.map }
    pub fn interpolator (&self)->&MotionInterpolator { &self.interpolator }

    /// store and display together, for callers that need to read the one and draw on the other
    pub fn parts_mut (&mut self)->(&TrackStore,&mut D) { (&self.store, &mut self.display) }

    pub fn set_transition_duration (&mut self, duration: Duration) {
        self.interpolator = MotionInterpolator::new( duration);
    }

    /// re-fit the map. Shapes move to their re-projected positions with the next batch
    pub fn refit (&mut self, bbox: &BoundingBox) {
        self.map.fit_bounds( bbox);
    }

    /// bring the track table in line with `batch`. Afterwards the store holds exactly one track per trackable
    /// id in `batch` and nothing else. Duplicate ids within the batch are resolved by last-one-wins
    pub fn reconcile (&mut self, batch: &[NormalizedEntityState])->ReconciliationReport {
        let mut report = ReconciliationReport::default();

        // index of the last occurrence of each trackable id
        let mut latest: HashMap<&str,usize> = HashMap::with_capacity( batch.len());
        for (i,e) in batch.iter().enumerate() {
            if e.is_trackable() {
                latest.insert( &*e.id, i);
            }
        }
        let seen: HashSet<&str> = latest.keys().copied().collect();

        for (i,e) in batch.iter().enumerate() {
            if latest.get( &*e.id) != Some(&i) { continue } // not trackable, or superseded later in batch

            if self.store.contains( &e.id) {
                if self.update_track( e) { report.updated.push( e.id.clone()); }
            } else {
                if self.create_track( e) { report.created.push( e.id.clone()); }
            }
        }

        let vanished: Vec<Arc<str>> = self.store.iter().filter( |t| !seen.contains( t.id())).map( |t| t.shared_id()).collect();
        for id in vanished {
            if let Some(track) = self.store.remove( &id) {
                self.display.remove_shape( track.handle());
                report.removed.push( id);
            }
        }

        if batch.len() > seen.len() {
            debug!("ignored {} non-trackable or duplicate batch entries", batch.len() - seen.len());
        }
        report
    }

    /// remove all tracks and their shapes, e.g. when shutting down a view
    pub fn clear (&mut self)->Vec<Arc<str>> {
        let mut removed = Vec::with_capacity( self.store.len());
        for track in self.store.drain() {
            self.display.remove_shape( track.handle());
            removed.push( track.shared_id());
        }
        removed
    }

    fn create_track (&mut self, e: &NormalizedEntityState)->bool {
        let Some(pos) = e.position else { return false };

        let heading = e.heading_or_zero();
        let handle = self.display.create_shape( self.map.project( &pos), heading);
        let track = Track::new( e.id.clone(), handle, heading, TrackMetadata::from(e));

        if let Err(track) = self.store.insert( track) {
            // store refused it - don't leave an orphaned shape behind
            warn!("duplicate track {}, dropping new shape", track.id());
            self.display.remove_shape( track.handle());
            return false
        }
        true
    }

    fn update_track (&mut self, e: &NormalizedEntityState)->bool {
        let Some(pos) = e.position else { return false };
        let Some(track) = self.store.get_mut( &e.id) else { return false };

        let new_heading = e.heading_or_zero();
        let delta = new_heading - track.last_heading;
        let handle = track.handle();

        track.metadata = TrackMetadata::from(e);
        track.last_heading = new_heading;
        track.last_update = Instant::now();
        track.n_updates += 1;

        // always incremental so that the accumulated rotation of the shape stays consistent
        self.display.rotate_by( handle, delta);
        let target = self.map.project( &pos);
        self.interpolator.interpolate( &mut self.display, handle, target);
        true
    }
}
