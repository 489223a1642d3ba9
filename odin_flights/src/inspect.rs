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

use std::{fmt, time::Duration};
use serde::{Serialize,Deserialize};
use tokio::time::Instant;
use tracing::debug;
use uom::si::{length::{foot,meter}, velocity::{knot,meter_per_second}};

use crate::{display::{DisplayAdapter,HandleId,UiEvent}, record::NO_LABEL, store::{Track,TrackStore}};

#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
pub enum DisplayUnits {
    #[default]
    Metric,   // m, m/s
    Aviation, // ft, kn
}

/// the transient popup content for an inspected track
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct DisplayPayload {
    pub label: String,
    pub altitude_text: String,
    pub speed_text: String,
    pub heading_text: String,
}

impl fmt::Display for DisplayPayload {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "{}\nAltitude: {}\nSpeed: {}\nHeading: {}", self.label, self.altitude_text, self.speed_text, self.heading_text)
    }
}

/// format the current metadata of a track. Absent values show as a placeholder, never as "0"
pub fn describe (track: &Track, units: DisplayUnits)->DisplayPayload {
    let m = track.metadata();

    let altitude_text = match units {
        DisplayUnits::Metric => fmt_rounded( m.altitude.map( |a| a.get::<meter>()), " m"),
        DisplayUnits::Aviation => fmt_rounded( m.altitude.map( |a| a.get::<foot>()), " ft"),
    };
    let speed_text = match units {
        DisplayUnits::Metric => fmt_rounded( m.speed.map( |s| s.get::<meter_per_second>()), " m/s"),
        DisplayUnits::Aviation => fmt_rounded( m.speed.map( |s| s.get::<knot>()), " kn"),
    };
    let heading_text = fmt_rounded( m.heading, "°");

    DisplayPayload { label: m.label.clone(), altitude_text, speed_text, heading_text }
}

fn fmt_rounded (v: Option<f64>, unit: &str)->String {
    match v {
        Some(v) if v.is_finite() => {
            let r = v.round();
            format!("{}{}", if r == 0.0 { 0.0 } else { r }, unit) // no "-0"
        }
        _ => NO_LABEL.to_string()
    }
}

#[derive(Debug,Clone)]
pub struct ActiveInspection {
    pub handle: HandleId,
    pub payload: DisplayPayload,
    pub expires: Instant,
}

/// turns selection events on shapes into timed payloads. It only reads the track store
#[derive(Debug)]
pub struct InspectionSurface {
    timeout: Duration,
    units: DisplayUnits,
    active: Option<ActiveInspection>,
}

impl InspectionSurface {
    pub fn new (timeout: Duration, units: DisplayUnits)->Self {
        InspectionSurface { timeout, units, active: None }
    }

    pub fn active (&self)->Option<&ActiveInspection> { self.active.as_ref() }
    pub fn expires_at (&self)->Option<Instant> { self.active.as_ref().map( |a| a.expires) }

    /// handle a shape event. Returns the shown payload if the event selected a known track. A new selection
    /// replaces the previous payload as a whole
    pub fn on_ui_event<D> (&mut self, store: &TrackStore, display: &mut D, handle: HandleId, event: UiEvent, now: Instant)->Option<&DisplayPayload>
        where D: DisplayAdapter
    {
        if !event.is_selection() { return None }

        let Some(track) = store.track_for_handle( handle) else {
            debug!("ignoring {:?} on unknown shape {}", event, handle);
            return None
        };

        let payload = describe( track, self.units);
        display.show_payload( handle, &payload);
        self.active = Some( ActiveInspection { handle, payload, expires: now + self.timeout });
        self.active.as_ref().map( |a| &a.payload)
    }

    /// dismiss the payload if its display time is up. Returns true if something was dismissed
    pub fn expire<D> (&mut self, display: &mut D, now: Instant)->bool where D: DisplayAdapter {
        match &self.active {
            Some(a) if a.expires <= now => {
                self.active = None;
                display.dismiss_payload();
                true
            }
            _ => false
        }
    }
}
