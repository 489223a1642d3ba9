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
#![allow(unused)]

use std::{path::Path, time::Duration};
use uom::si::length::{kilometer,nautical_mile};
use odin_flights::{
    BoundingBox, FlightsConfig, GeoPos, MapView, Provider, Region, RegionQuery, WebMercatorView,
    MissingBatchPolicy, DisplayUnits, load_config, load_config_from, DEFAULT_CONFIG,
};

fn chicago ()->Region {
    Region::new( "Chicago", GeoPos::new( 41.8781, -87.6298), BoundingBox::new( 41.60, 42.10, -87.95, -87.50))
}

// run with "cargo test --test test_region -- --nocapture"

#[test]
fn test_bbox_serde() {
    let input = r#"{ "name": "Chicago", "center": { "lat": 41.8781, "lng": -87.6298 }, "bbox": [41.6, 42.1, -87.95, -87.5] }"#;
    let region: Region = serde_json::from_str( input).unwrap();
    println!("{region:?}");
    assert_eq!( region, chicago());

    let json = serde_json::to_string( &region.bbox).unwrap();
    assert_eq!( json, "[41.6,42.1,-87.95,-87.5]");

    assert!( region.bbox.contains( &region.center));
    assert!( !region.bbox.contains( &GeoPos::new( 40.7, -74.0)));
    assert!( region.bbox.is_valid());
    assert!( !BoundingBox::new( 42.1, 41.6, -87.95, -87.5).is_valid());
}

#[test]
fn test_region_query() {
    let region = chicago();
    let r = region.radius();
    println!("{}", region.query( true));
    // distance to the farthest corner of a ~37x56 km box, center is off the bbox center
    assert!( r.get::<kilometer>() > 35.0 && r.get::<kilometer>() < 50.0, "radius {}km", r.get::<kilometer>());

    match region.query( false) {
        RegionQuery::BoundingBox(bbox) => assert_eq!( bbox, region.bbox),
        other => panic!("unexpected query {other}")
    }
}

#[test]
fn test_distance() {
    let chi = GeoPos::new( 41.8781, -87.6298);
    let nyc = GeoPos::new( 40.7128, -74.0060);
    let d = chi.distance_to( &nyc);
    println!("Chicago - New York: {:.1}km ({:.1}nm)", d.get::<kilometer>(), d.get::<nautical_mile>());
    assert!( d.get::<kilometer>() > 1135.0 && d.get::<kilometer>() < 1155.0);
    assert!( (nyc.distance_to( &chi) - d).get::<kilometer>().abs() < 1e-6);
    assert_eq!( chi.distance_to( &chi).get::<kilometer>(), 0.0);

    // one degree of latitude along a meridian
    let d = GeoPos::new( 41.0, -87.0).distance_to( &GeoPos::new( 42.0, -87.0));
    assert!( (d.get::<kilometer>() - 111.2).abs() < 0.5);
}

#[test]
fn test_projection() {
    let region = chicago();
    let view = WebMercatorView::new( 1000.0, 800.0, &region.bbox);

    let nw = view.project( &GeoPos::new( region.bbox.north, region.bbox.west));
    let ne = view.project( &GeoPos::new( region.bbox.north, region.bbox.east));
    let sw = view.project( &GeoPos::new( region.bbox.south, region.bbox.west));
    let se = view.project( &GeoPos::new( region.bbox.south, region.bbox.east));
    println!("nw: {nw}, ne: {ne}, sw: {sw}, se: {se}");

    for p in [nw, ne, sw, se] { // bbox fits into the viewport
        assert!( p.x >= -1e-6 && p.x <= 1000.0 + 1e-6);
        assert!( p.y >= -1e-6 && p.y <= 800.0 + 1e-6);
    }
    assert!( nw.x < ne.x); // east is right
    assert!( nw.y < sw.y); // north is up
    assert!( (nw.y - ne.y).abs() < 1e-6);
    assert!( ((nw.x + se.x) / 2.0 - 500.0).abs() < 1e-6);
    assert!( ((nw.y + se.y) / 2.0 - 400.0).abs() < 1e-6);
}

#[test]
fn test_default_config() {
    let config: FlightsConfig = load_config( DEFAULT_CONFIG).unwrap();
    println!("{config:#?}");
    config.validate().unwrap();

    assert_eq!( config.regions.len(), 2);
    assert_eq!( config.regions[0], chicago());
    assert_eq!( config.poll_interval, Duration::from_secs(10));
    assert!( matches!( config.provider, Provider::OpenSky{..}));
    assert_eq!( config.missing_batch, MissingBatchPolicy::ClearTracks);
    assert_eq!( config.region_index("new york"), Some(1));
    assert_eq!( config.region_index("1"), Some(1));
    assert_eq!( config.region_index("2"), None);
    assert_eq!( config.interpolator().duration(), Duration::from_secs(9));

    let path = Path::new( env!("CARGO_MANIFEST_DIR")).join("configs").join( DEFAULT_CONFIG);
    let config1: FlightsConfig = load_config_from( &path).unwrap();
    assert_eq!( config, config1);

    assert!( load_config::<FlightsConfig>("no_such_config.ron").is_err());
}

#[test]
fn test_config_defaults_and_validation() {
    let input = r#"FlightsConfig(
        regions: [ ( name: "Chicago", center: (lat: 41.8781, lon: -87.6298), bbox: (41.60, 42.10, -87.95, -87.50) ) ],
        provider: Simulated( n_aircraft: 5, step: (secs: 10, nanos: 0) ),
        poll_interval: (secs: 10, nanos: 0),
    )"#;
    let mut config: FlightsConfig = ron::from_str( input).unwrap();
    assert_eq!( config.transition_ratio, 0.9);
    assert_eq!( config.inspection_timeout, Duration::from_secs(5));
    assert_eq!( config.display_units, DisplayUnits::Metric);
    assert_eq!( config.max_retries, 0);
    assert!( config.validate().is_ok());

    config.transition_ratio = 0.3;
    assert!( config.validate().is_err());
    config.transition_ratio = 0.9;

    config.poll_interval = Duration::ZERO;
    assert!( config.validate().is_err());
    config.poll_interval = Duration::from_secs(10);

    config.regions.clear();
    assert!( config.validate().is_err());
}
