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

use std::{collections::HashMap, fmt, sync::Arc};
use chrono::{DateTime,Utc};
use tokio::time::Instant;
use uom::si::{f64::{Length,Velocity}, length::meter, velocity::knot};

use crate::{display::HandleId, record::NormalizedEntityState, region::GeoPos};

/// the part of a track that gets overwritten on every reconciliation in which the entity reappears
#[derive(Debug,Clone,PartialEq)]
pub struct TrackMetadata {
    pub label: String,
    pub position: Option<GeoPos>,
    pub altitude: Option<Length>,
    pub speed: Option<Velocity>,
    pub heading: Option<f64>,
    pub last_contact: Option<DateTime<Utc>>,
}

impl From<&NormalizedEntityState> for TrackMetadata {
    fn from (e: &NormalizedEntityState)->Self {
        TrackMetadata {
            label: e.label.clone(),
            position: e.position,
            altitude: e.altitude,
            speed: e.speed,
            heading: e.heading,
            last_contact: e.last_contact,
        }
    }
}

/// the live representation of one currently visible entity. The visual handle is exclusively owned by the
/// track - whoever removes a track from the store has to destroy its shape
#[derive(Debug)]
pub struct Track {
    id: Arc<str>,
    handle: HandleId,
    pub(crate) last_heading: f64,
    pub(crate) metadata: TrackMetadata,
    created: Instant,
    pub(crate) last_update: Instant,
    pub(crate) n_updates: usize,
}

impl Track {
    pub(crate) fn new (id: Arc<str>, handle: HandleId, heading: f64, metadata: TrackMetadata)->Self {
        let now = Instant::now();
        Track { id, handle, last_heading: heading, metadata, created: now, last_update: now, n_updates: 0 }
    }

    pub fn id (&self)->&str { &self.id }
    pub fn shared_id (&self)->Arc<str> { self.id.clone() }
    pub fn handle (&self)->HandleId { self.handle }
    pub fn last_heading (&self)->f64 { self.last_heading }
    pub fn metadata (&self)->&TrackMetadata { &self.metadata }
    pub fn created (&self)->Instant { self.created }
    pub fn last_update (&self)->Instant { self.last_update }
    pub fn n_updates (&self)->usize { self.n_updates }
}

impl fmt::Display for Track {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metadata;
        write!( f, "Track( id: {}, handle: {}, label: \"{}\"", self.id, self.handle, m.label)?;
        if let Some(p) = &m.position { write!( f, ", pos: {}", p)?; }
        if let Some(alt) = m.altitude { write!( f, ", alt: {:.0}m", alt.get::<meter>())?; }
        if let Some(spd) = m.speed { write!( f, ", spd: {:.0}kn", spd.get::<knot>())?; }
        write!( f, ", hdg: {:.0}, updates: {})", self.last_heading, self.n_updates)
    }
}

/// in-memory table of live tracks, keyed by entity identity. There is at most one track per id, and a
/// handle->id back reference so that shape events can be resolved without the shape owning anything
#[derive(Debug,Default)]
pub struct TrackStore {
    tracks: HashMap<Arc<str>,Track>,
    by_handle: HashMap<HandleId,Arc<str>>,
}

impl TrackStore {
    pub fn new ()->Self { TrackStore::default() }

    pub fn len (&self)->usize { self.tracks.len() }
    pub fn is_empty (&self)->bool { self.tracks.is_empty() }
    pub fn contains (&self, id: &str)->bool { self.tracks.contains_key( id) }

    pub fn get (&self, id: &str)->Option<&Track> { self.tracks.get( id) }
    pub(crate) fn get_mut (&mut self, id: &str)->Option<&mut Track> { self.tracks.get_mut( id) }

    /// the back-reference lookup for shape events
    pub fn track_for_handle (&self, handle: HandleId)->Option<&Track> {
        self.by_handle.get( &handle).and_then( |id| self.tracks.get( id))
    }

    pub fn iter (&self)->impl Iterator<Item=&Track> { self.tracks.values() }
    pub fn ids (&self)->impl Iterator<Item=&Arc<str>> { self.tracks.keys() }

    /// sorted ids, mostly for display and tests
    pub fn sorted_ids (&self)->Vec<Arc<str>> {
        let mut ids: Vec<Arc<str>> = self.tracks.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// refuses to replace an existing track - the caller gets its track back
    pub(crate) fn insert (&mut self, track: Track)->std::result::Result<(),Track> {
        if self.tracks.contains_key( &track.id) {
            Err(track)
        } else {
            self.by_handle.insert( track.handle, track.id.clone());
            self.tracks.insert( track.id.clone(), track);
            Ok(())
        }
    }

    pub(crate) fn remove (&mut self, id: &str)->Option<Track> {
        let track = self.tracks.remove( id)?;
        self.by_handle.remove( &track.handle);
        Some(track)
    }

    pub(crate) fn drain (&mut self)->Vec<Track> {
        self.by_handle.clear();
        self.tracks.drain().map( |(_,t)| t).collect()
    }
}
