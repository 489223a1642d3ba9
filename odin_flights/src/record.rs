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

use std::{fmt, sync::Arc};
use chrono::{DateTime,Utc};
use uom::si::{f64::{Length,Velocity}, length::{foot,meter}, velocity::{knot,meter_per_second}};
use crate::region::GeoPos;

/// what we show if an entity has neither a callsign nor a registration
pub const NO_LABEL: &str = "–––";

/// a decoded provider record. Providers differ in shape and units - by the time we have an `EntityRecord`
/// units are converted into uom quantities but nothing is validated yet
#[derive(Debug,Clone,Default,PartialEq)]
pub struct EntityRecord {
    pub id: Option<String>,              // icao24 or equivalent, stable across polls
    pub label: Option<String>,           // callsign
    pub secondary_label: Option<String>, // registration or flight number
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<Length>,
    pub speed: Option<Velocity>,
    pub heading: Option<f64>,            // degrees
    pub on_ground: Option<bool>,
    pub last_contact: Option<DateTime<Utc>>,
}

/// why a record did not make it into a batch
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum RecordSkip {
    NoIdentity,
    NoPosition,
    OnGround,
}

/// the canonical entity state every provider record is mapped into
#[derive(Debug,Clone,PartialEq)]
pub struct NormalizedEntityState {
    pub id: Arc<str>,
    pub label: String,
    pub position: Option<GeoPos>,
    pub altitude: Option<Length>,
    pub speed: Option<Velocity>,
    pub heading: Option<f64>,
    pub on_ground: bool,
    pub last_contact: Option<DateTime<Utc>>,
}

impl NormalizedEntityState {
    /// returns None if the record has no usable identity. Position is only set if both coordinates are present and valid
    pub fn from_record (rec: EntityRecord)->Option<Self> {
        let id = non_empty( rec.id)?;
        let label = non_empty( rec.label)
            .or_else( || non_empty( rec.secondary_label))
            .unwrap_or_else( || NO_LABEL.to_string());

        let position = match (rec.lat, rec.lon) {
            (Some(lat),Some(lon)) => Some( GeoPos::new(lat,lon)).filter( |p| p.is_valid()),
            _ => None
        };

        Some( NormalizedEntityState {
            id: Arc::from( id.as_str()),
            label,
            position,
            altitude: rec.altitude.filter( |a| a.value.is_finite()),
            speed: rec.speed.filter( |s| s.value.is_finite()),
            heading: rec.heading.filter( |h| h.is_finite()),
            on_ground: rec.on_ground.unwrap_or(false),
            last_contact: rec.last_contact,
        })
    }

    /// only airborne entities with a position fix get tracked
    pub fn is_trackable (&self)->bool {
        !self.on_ground && self.position.is_some()
    }

    pub fn skip_reason (&self)->Option<RecordSkip> {
        if self.on_ground { Some(RecordSkip::OnGround) }
        else if self.position.is_none() { Some(RecordSkip::NoPosition) }
        else { None }
    }

    /// absent heading counts as north
    pub fn heading_or_zero (&self)->f64 { self.heading.unwrap_or(0.0) }
}

impl fmt::Display for NormalizedEntityState {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "Entity( id: {}, label: \"{}\"", self.id, self.label)?;
        if let Some(p) = &self.position { write!( f, ", pos: {}", p)?; }
        if let Some(alt) = self.altitude { write!( f, ", alt: {:.0}m", alt.get::<meter>())?; }
        if let Some(spd) = self.speed { write!( f, ", spd: {:.1}kn", spd.get::<knot>())?; }
        if let Some(hdg) = self.heading { write!( f, ", hdg: {:.0}", hdg)?; }
        if self.on_ground { write!( f, ", on_ground")?; }
        write!( f, ")")
    }
}

/// counts of what normalization dropped, for logging
#[derive(Debug,Clone,Copy,Default,PartialEq,Eq)]
pub struct SkipCounts {
    pub no_identity: usize,
    pub no_position: usize,
    pub on_ground: usize,
}

impl SkipCounts {
    pub fn total (&self)->usize { self.no_identity + self.no_position + self.on_ground }

    fn count (&mut self, reason: RecordSkip) {
        match reason {
            RecordSkip::NoIdentity => self.no_identity += 1,
            RecordSkip::NoPosition => self.no_position += 1,
            RecordSkip::OnGround => self.on_ground += 1,
        }
    }
}

/// map raw records into the batch the reconciliation engine consumes, i.e. only trackable entities.
/// Partial records are skipped, never an error
pub fn normalize_batch<I> (records: I)->(Vec<NormalizedEntityState>,SkipCounts) where I: IntoIterator<Item=EntityRecord> {
    let mut skipped = SkipCounts::default();
    let mut batch = Vec::new();

    for rec in records {
        match NormalizedEntityState::from_record( rec) {
            Some(state) => match state.skip_reason() {
                Some(reason) => skipped.count( reason),
                None => batch.push( state)
            }
            None => skipped.count( RecordSkip::NoIdentity)
        }
    }

    (batch, skipped)
}

fn non_empty (s: Option<String>)->Option<String> {
    s.map( |s| s.trim().to_string()).filter( |s| !s.is_empty())
}

//--- unit helpers for provider decoders

#[inline] pub fn meters (v: f64)->Length { Length::new::<meter>(v) }
#[inline] pub fn feet (v: f64)->Length { Length::new::<foot>(v) }
#[inline] pub fn meters_per_second (v: f64)->Velocity { Velocity::new::<meter_per_second>(v) }
#[inline] pub fn knots (v: f64)->Velocity { Velocity::new::<knot>(v) }
