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

use std::time::Duration;
use crate::display::{DisplayAdapter,HandleId,ScreenPoint};

pub const MIN_TRANSITION_RATIO: f64 = 0.5;
pub const MAX_TRANSITION_RATIO: f64 = 0.95;

/// a linear move of a shape between two screen positions
#[derive(Debug,Clone,PartialEq)]
pub struct Transition {
    pub from: ScreenPoint,
    pub to: ScreenPoint,
    pub duration: Duration,
}

impl Transition {
    pub fn new (from: ScreenPoint, to: ScreenPoint, duration: Duration)->Self {
        Transition { from, to, duration }
    }

    /// fraction of the transition done after `elapsed`, in [0,1]
    pub fn progress (&self, elapsed: Duration)->f64 {
        if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp( 0.0, 1.0)
        }
    }

    pub fn position_at (&self, elapsed: Duration)->ScreenPoint {
        self.from.lerp( &self.to, self.progress( elapsed))
    }

    pub fn is_complete (&self, elapsed: Duration)->bool {
        elapsed >= self.duration
    }
}

/// turns target position changes into transitions that finish before the next snapshot arrives.
/// This does not own anything, its only effect is on the display
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct MotionInterpolator {
    duration: Duration,
}

impl MotionInterpolator {
    pub fn new (duration: Duration)->Self { MotionInterpolator{duration} }

    /// the transition duration is a fraction of the poll interval, clamped to [MIN_TRANSITION_RATIO,MAX_TRANSITION_RATIO]
    pub fn for_poll_interval (poll_interval: Duration, ratio: f64)->Self {
        let ratio = if ratio.is_finite() { ratio.clamp( MIN_TRANSITION_RATIO, MAX_TRANSITION_RATIO) } else { MAX_TRANSITION_RATIO };
        MotionInterpolator { duration: poll_interval.mul_f64( ratio) }
    }

    pub fn duration (&self)->Duration { self.duration }

    /// move `handle` from wherever it is right now to `to`. Returns the scheduled transition, or None if the
    /// display does not know the handle
    pub fn interpolate<D> (&self, display: &mut D, handle: HandleId, to: ScreenPoint)->Option<Transition> where D: DisplayAdapter {
        let from = display.position_of( handle)?;
        let transition = Transition::new( from, to, self.duration);
        display.start_transition( handle, transition.clone());
        Some(transition)
    }
}
