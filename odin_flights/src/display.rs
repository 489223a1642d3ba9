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

///! the narrow interfaces to the map (projection) and the drawing surface (shapes, rotation, tweens),
///! plus a headless in-memory drawing surface

use std::{collections::{HashMap,VecDeque}, f64::consts::PI, fmt};
use tokio::time::Instant;
use tracing::{debug,trace};

use crate::{inspect::DisplayPayload, motion::Transition, region::{BoundingBox,GeoPos}};

/// a 2-D drawing surface coordinate (pixels, y pointing down)
#[derive(Debug,Clone,Copy,PartialEq,Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new (x: f64, y: f64)->Self { ScreenPoint{x,y} }

    pub fn lerp (&self, to: &ScreenPoint, t: f64)->ScreenPoint {
        ScreenPoint::new( self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
    }

    pub fn distance_to (&self, other: &ScreenPoint)->f64 {
        (other.x - self.x).hypot( other.y - self.y)
    }
}

impl fmt::Display for ScreenPoint {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "[{:.1},{:.1}]", self.x, self.y)
    }
}

/// opaque id of a shape on the drawing surface. Issued by the [`DisplayAdapter`]
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,PartialOrd,Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!( f, "#{}", self.0) }
}

/// user interaction on a shape, forwarded by the drawing surface as `(HandleId,UiEvent)`
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum UiEvent {
    Click,
    Tap,
    Hover,
}

impl UiEvent {
    pub fn is_selection (&self)->bool { matches!( self, UiEvent::Click | UiEvent::Tap) }
}

/// the geographic display surface
pub trait MapView {
    fn project (&self, pos: &GeoPos)->ScreenPoint;
    fn fit_bounds (&mut self, bbox: &BoundingBox);
}

/// the vector drawing / animation surface. Shapes are owned by tracks, the adapter only hands out ids
pub trait DisplayAdapter {
    fn create_shape (&mut self, at: ScreenPoint, rotation: f64)->HandleId;

    /// incremental rotation. Implementations accumulate, there is no absolute set after creation
    fn rotate_by (&mut self, handle: HandleId, delta: f64);

    /// current on-screen position, which might be mid-transition
    fn position_of (&self, handle: HandleId)->Option<ScreenPoint>;

    /// schedule a transition. A running transition of the same handle is superseded, not queued
    fn start_transition (&mut self, handle: HandleId, transition: Transition);

    fn remove_shape (&mut self, handle: HandleId);

    fn show_payload (&mut self, _handle: HandleId, _payload: &DisplayPayload) {}
    fn dismiss_payload (&mut self) {}
}

/* #region web mercator map view ***************************************************************************/

/// a web-mercator projection that fits a bounding box into a fixed size viewport
#[derive(Debug,Clone)]
pub struct WebMercatorView {
    width: f64,
    height: f64,
    scale: f64,          // viewport pixels per world unit
    center: (f64,f64),   // viewport center in world units
}

impl WebMercatorView {
    pub fn new (width: f64, height: f64, bbox: &BoundingBox)->Self {
        let mut view = WebMercatorView { width, height, scale: 1.0, center: (0.5,0.5) };
        view.fit_bounds( bbox);
        view
    }

    pub fn size (&self)->(f64,f64) { (self.width, self.height) }

    /// normalized [0,1] world coordinates (y grows southwards)
    fn world (pos: &GeoPos)->(f64,f64) {
        let lat = pos.lat.clamp( -85.05112878, 85.05112878).to_radians();
        let x = (pos.lon + 180.0) / 360.0;
        let y = (1.0 - lat.tan().asinh() / PI) / 2.0;
        (x,y)
    }
}

impl MapView for WebMercatorView {
    fn project (&self, pos: &GeoPos)->ScreenPoint {
        let (x,y) = Self::world( pos);
        ScreenPoint::new( (x - self.center.0) * self.scale + self.width / 2.0,
                          (y - self.center.1) * self.scale + self.height / 2.0)
    }

    fn fit_bounds (&mut self, bbox: &BoundingBox) {
        let (x0,y0) = Self::world( &GeoPos::new( bbox.north, bbox.west));
        let (x1,y1) = Self::world( &GeoPos::new( bbox.south, bbox.east));
        let dx = (x1 - x0).abs().max( f64::EPSILON);
        let dy = (y1 - y0).abs().max( f64::EPSILON);

        self.scale = (self.width / dx).min( self.height / dy);
        self.center = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
        debug!("map view fitted to {bbox} (scale {:.1})", self.scale);
    }
}

/* #endregion web mercator map view */

/* #region headless display ********************************************************************************/

/// what happened on a [`HeadlessDisplay`], oldest first
#[derive(Debug,Clone,PartialEq)]
pub enum DisplayOp {
    Created { handle: HandleId, at: ScreenPoint, rotation: f64 },
    Rotated { handle: HandleId, delta: f64 },
    Transition { handle: HandleId, transition: Transition },
    Removed { handle: HandleId },
    PayloadShown { handle: HandleId, payload: DisplayPayload },
    PayloadDismissed,
}

#[derive(Debug,Clone)]
pub struct Shape {
    pub anchor: ScreenPoint,    // resting position, i.e. where the last transition ends
    pub rotation: f64,          // accumulated, not normalized
    pub transition: Option<(Transition,Instant)>,
}

impl Shape {
    pub fn position_at (&self, now: Instant)->ScreenPoint {
        match &self.transition {
            Some((t,start)) if !t.is_complete( now.saturating_duration_since( *start)) => {
                t.position_at( now.saturating_duration_since( *start))
            }
            _ => self.anchor
        }
    }

    /// drop the transition once it is done. The shape then rests at its anchor
    pub fn settle (&mut self, now: Instant) {
        if !self.is_moving( now) { self.transition = None }
    }

    pub fn is_moving (&self, now: Instant)->bool {
        self.transition.as_ref().map( |(t,start)| !t.is_complete( now.saturating_duration_since( *start))).unwrap_or(false)
    }
}

/// an in-memory drawing surface. Keeps at most one active transition per shape and a bounded log of operations
pub struct HeadlessDisplay {
    next_id: u64,
    shapes: HashMap<HandleId,Shape>,
    payload: Option<(HandleId,DisplayPayload)>,
    ops: VecDeque<DisplayOp>,
    max_ops: usize,
}

impl HeadlessDisplay {
    pub fn new ()->Self { Self::with_log_capacity( 1024) }

    pub fn with_log_capacity (max_ops: usize)->Self {
        HeadlessDisplay { next_id: 1, shapes: HashMap::new(), payload: None, ops: VecDeque::with_capacity(max_ops.min(4096)), max_ops }
    }

    pub fn shape (&self, handle: HandleId)->Option<&Shape> { self.shapes.get( &handle) }
    pub fn shape_count (&self)->usize { self.shapes.len() }
    pub fn handles (&self)->impl Iterator<Item=&HandleId> { self.shapes.keys() }

    /// number of shapes that are still moving at `now`
    pub fn active_transitions (&self, now: Instant)->usize {
        self.shapes.values().filter( |s| s.is_moving(now)).count()
    }

    pub fn payload (&self)->Option<&(HandleId,DisplayPayload)> { self.payload.as_ref() }

    pub fn ops (&self)->impl Iterator<Item=&DisplayOp> { self.ops.iter() }
    pub fn clear_ops (&mut self) { self.ops.clear() }

    fn log (&mut self, op: DisplayOp) {
        trace!("display op {:?}", op);
        if self.max_ops > 0 {
            if self.ops.len() >= self.max_ops { self.ops.pop_front(); }
            self.ops.push_back( op);
        }
    }
}

impl Default for HeadlessDisplay {
    fn default()->Self { HeadlessDisplay::new() }
}

impl DisplayAdapter for HeadlessDisplay {
    fn create_shape (&mut self, at: ScreenPoint, rotation: f64)->HandleId {
        let handle = HandleId(self.next_id);
        self.next_id += 1;
        self.shapes.insert( handle, Shape { anchor: at, rotation, transition: None });
        self.log( DisplayOp::Created { handle, at, rotation });
        handle
    }

    fn rotate_by (&mut self, handle: HandleId, delta: f64) {
        if let Some(shape) = self.shapes.get_mut( &handle) {
            shape.rotation += delta;
            self.log( DisplayOp::Rotated { handle, delta });
        }
    }

    fn position_of (&self, handle: HandleId)->Option<ScreenPoint> {
        self.shapes.get( &handle).map( |s| s.position_at( Instant::now()))
    }

    fn start_transition (&mut self, handle: HandleId, transition: Transition) {
        let now = Instant::now();
        if let Some(shape) = self.shapes.get_mut( &handle) {
            shape.settle( now);
            shape.anchor = transition.to;
            shape.transition = Some( (transition.clone(), now));
            self.log( DisplayOp::Transition { handle, transition });
        }
    }

    fn remove_shape (&mut self, handle: HandleId) {
        if self.shapes.remove( &handle).is_some() {
            self.log( DisplayOp::Removed { handle });
        }
    }

    fn show_payload (&mut self, handle: HandleId, payload: &DisplayPayload) {
        self.payload = Some( (handle, payload.clone()));
        self.log( DisplayOp::PayloadShown { handle, payload: payload.clone() });
    }

    fn dismiss_payload (&mut self) {
        if self.payload.take().is_some() {
            self.log( DisplayOp::PayloadDismissed);
        }
    }
}

/* #endregion headless display */
