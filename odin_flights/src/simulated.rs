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

use std::{f64::consts::PI, sync::atomic::{AtomicU64,Ordering}, time::Duration};
use async_trait::async_trait;
use chrono::Utc;

use crate::{
    errors::FetchError,
    fetch::SnapshotFetcher,
    record::{EntityRecord,NormalizedEntityState,normalize_batch,meters,meters_per_second},
    region::Region,
};

const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// deterministic synthetic traffic: aircraft fly circles around the region center. Aircraft #0 is parked on
/// the ground and every aircraft drops out of a snapshot now and then, so that all reconciliation paths get
/// exercised without a network connection
pub struct SimulatedFetcher {
    n_aircraft: usize,
    step: Duration,
    tick: AtomicU64,
}

impl SimulatedFetcher {
    pub fn new (n_aircraft: usize, step: Duration)->Self {
        SimulatedFetcher { n_aircraft, step, tick: AtomicU64::new(0) }
    }

    /// the records of snapshot number `tick` - a pure function of (region,tick)
    pub fn records (&self, region: &Region, tick: u64)->Vec<EntityRecord> {
        let t = tick as f64 * self.step.as_secs_f64();
        let c = region.center;
        let half_lat = (region.bbox.north - region.bbox.south) / 2.0;
        let half_lon = (region.bbox.east - region.bbox.west) / 2.0;
        let cos_lat = c.lat.to_radians().cos().max(0.01);
        let n = self.n_aircraft.max(1) as f64;

        let mut records = Vec::with_capacity( self.n_aircraft);
        for i in 0..self.n_aircraft {
            if i > 0 && (tick + 7 * i as u64) % 23 == 0 { continue } // transient dropout

            let fi = i as f64;
            let r = 0.2 + 0.7 * ((i * 37) % 100) as f64 / 100.0; // fraction of the region extent
            let r_m = r * half_lat * METERS_PER_DEG_LAT;
            let speed = 80.0 + 5.0 * (i % 20) as f64; // m/s
            let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
            let theta = 2.0 * PI * fi / n + dir * speed * t / r_m.max(1.0);

            let lat = c.lat + r * half_lat * theta.sin();
            let lon = c.lon + r * half_lon * theta.cos();

            // direction of motion: d/dtheta (east,north) = (-sin,cos), scaled by orientation
            let east = -dir * theta.sin() * half_lon * cos_lat;
            let north = dir * theta.cos() * half_lat;
            let heading = east.atan2( north).to_degrees().rem_euclid( 360.0);

            records.push( EntityRecord {
                id: Some( format!("{:06x}", 0xa00000 + i)),
                label: if i % 5 == 4 { None } else { Some( format!("SIM{:03}", i)) },
                secondary_label: Some( format!("N{}SM", 100 + i)),
                lat: Some(lat),
                lon: Some(lon),
                altitude: Some( meters( 1000.0 + 300.0 * fi)),
                speed: Some( meters_per_second( speed)),
                heading: if i % 7 == 6 { None } else { Some(heading) },
                on_ground: Some( i == 0),
                last_contact: Some( Utc::now()),
            });
        }
        records
    }
}

#[async_trait]
impl SnapshotFetcher for SimulatedFetcher {
    async fn fetch (&self, region: &Region)->std::result::Result<Vec<NormalizedEntityState>,FetchError> {
        let tick = self.tick.fetch_add( 1, Ordering::Relaxed);
        let (batch, _skipped) = normalize_batch( self.records( region, tick));
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{BoundingBox,GeoPos};

    fn region ()->Region {
        Region::new( "Chicago", GeoPos::new( 41.85, -87.75), BoundingBox::new( 41.6, 42.1, -88.0, -87.5))
    }

    #[test]
    fn test_deterministic_records() {
        let sim = SimulatedFetcher::new( 12, Duration::from_secs(10));
        let region = region();

        assert_eq!( sim.records( &region, 3).len(), sim.records( &region, 3).len());
        for tick in 0..30 {
            let (batch, skipped) = normalize_batch( sim.records( &region, tick));
            assert_eq!( skipped.on_ground, 1); // #0 is parked
            assert!( batch.iter().all( |e| e.position.map( |p| region.bbox.contains(&p)).unwrap_or(false)));
            assert!( batch.len() <= 11);
        }

        // everybody drops out now and then
        let n_present = (0..23).filter( |tick| sim.records( &region, *tick).iter().any( |r| r.id.as_deref() == Some("a00001"))).count();
        assert_eq!( n_present, 22);
    }
}
