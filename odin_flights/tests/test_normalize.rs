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

use uom::si::{length::{meter,foot}, velocity::{meter_per_second,knot}};
use odin_flights::{
    EntityRecord, FetchError, MissingBatchPolicy, NO_LABEL, normalize_batch, parse_snapshot,
    fetch::{WireFormat,decode_records},
    record::{meters,knots},
};

//--- test data

const OPENSKY: &str = r#"{"time":1700000000,"states":[
  ["a1b2c3","UAL123  ","United States",1700000000,1700000001,-87.70,41.90,10668.0,false,230.5,92.3,0.0,null,10700.0,"1234",false,0],
  ["d4e5f6","SWA9    ","United States",1700000000,1700000001,-87.90,41.97,null,true,3.2,180.0,null,null,null,null,false,0],
  ["0a0b0c","        ","United States",null,1700000001,null,null,null,false,null,null,null,null,null,null,false,0],
  ["abcdef","N123","United States",1700000000]
]}"#;

const OPENSKY_NULL_STATES: &str = r#"{"time":1700000000,"states":null}"#;
const OPENSKY_NO_STATES: &str = r#"{"time":1700000000}"#;

const AIRCRAFT_LIST: &str = r#"{"now":1700000000.5,"total":3,"ac":[
  {"hex":"a1b2c3","flight":"DAL42   ","r":"N42DL","lat":41.8,"lon":-87.6,"alt_baro":35000,"gs":450.0,"track":271.4,"seen":1.5},
  {"hex":"b2c3d4","r":"N77XY","lat":41.98,"lon":-87.9,"alt_baro":"ground","gs":12.0},
  {"hex":"c3d4e5","r":"N88AB","lat":41.7,"lon":-87.7,"alt_geom":5000}
]}"#;

const AVIATIONSTACK: &str = r#"{"pagination":{"limit":100,"offset":0,"count":2,"total":2},"data":[
  {"flight":{"icao":"AAL100","iata":"AA100"},"aircraft":{"icao24":"A0B1C2","registration":"N100AA"},
   "live":{"updated":"2023-11-14T22:13:20+00:00","latitude":41.85,"longitude":-87.65,"altitude":9000.0,"direction":45.0,"speed_horizontal":900.0,"is_ground":false}},
  {"flight":{"icao":"AAL200","iata":"AA200"},"aircraft":{"icao24":"A0B1C3","registration":"N200AA"},"live":null}
]}"#;

// run with "cargo test --test test_normalize -- --nocapture"

#[test]
fn test_opensky() {
    let snapshot = parse_snapshot( WireFormat::OpenSky, OPENSKY.as_bytes(), MissingBatchPolicy::ClearTracks).unwrap();
    for e in &snapshot.entities { println!("{e}") }
    println!("skipped: {:?}, malformed: {}", snapshot.skipped, snapshot.malformed);

    assert_eq!( snapshot.entities.len(), 1);
    let e = &snapshot.entities[0];
    assert_eq!( &*e.id, "a1b2c3");
    assert_eq!( e.label, "UAL123");
    let pos = e.position.unwrap();
    assert_eq!( (pos.lat, pos.lon), (41.90, -87.70));
    assert!( (e.altitude.unwrap().get::<meter>() - 10668.0).abs() < 1e-6);
    assert!( (e.speed.unwrap().get::<meter_per_second>() - 230.5).abs() < 1e-6);
    assert_eq!( e.heading, Some(92.3));
    assert!( e.last_contact.is_some());

    assert_eq!( snapshot.skipped.on_ground, 1);
    assert_eq!( snapshot.skipped.no_position, 1);
    assert_eq!( snapshot.malformed, 1); // truncated state vector
    assert!( !snapshot.missing_batch);
}

#[test]
fn test_opensky_geo_altitude_fallback() {
    let body = r#"{"states":[["a1","X1",null,null,null,-87.7,41.9,null,false,null,null,null,null,1500.0]]}"#;
    let snapshot = parse_snapshot( WireFormat::OpenSky, body.as_bytes(), MissingBatchPolicy::ClearTracks).unwrap();
    let e = &snapshot.entities[0];
    assert!( (e.altitude.unwrap().get::<meter>() - 1500.0).abs() < 1e-6);
    assert!( e.speed.is_none());
    assert!( e.heading.is_none());
}

#[test]
fn test_null_batch_is_empty() {
    for policy in [MissingBatchPolicy::ClearTracks, MissingBatchPolicy::RetainTracks] {
        let snapshot = parse_snapshot( WireFormat::OpenSky, OPENSKY_NULL_STATES.as_bytes(), policy).unwrap();
        assert!( snapshot.entities.is_empty());
        assert!( !snapshot.missing_batch);
    }
}

#[test]
fn test_missing_batch_policy() {
    let snapshot = parse_snapshot( WireFormat::OpenSky, OPENSKY_NO_STATES.as_bytes(), MissingBatchPolicy::ClearTracks).unwrap();
    assert!( snapshot.entities.is_empty());
    assert!( snapshot.missing_batch);

    let res = parse_snapshot( WireFormat::OpenSky, OPENSKY_NO_STATES.as_bytes(), MissingBatchPolicy::RetainTracks);
    println!("{res:?}");
    assert!( matches!( res, Err(FetchError::MalformedPayload(_))));

    assert_eq!( decode_records( WireFormat::OpenSky, OPENSKY_NO_STATES.as_bytes()).unwrap(), None);
}

#[test]
fn test_malformed_payload() {
    for body in ["<html>503 Service Unavailable</html>", "", "[1,2,3]", "\"states\""] {
        let res = parse_snapshot( WireFormat::OpenSky, body.as_bytes(), MissingBatchPolicy::ClearTracks);
        println!("{body:?} -> {res:?}");
        assert!( matches!( res, Err(FetchError::MalformedPayload(_))));
    }
}

#[test]
fn test_aircraft_list() {
    let snapshot = parse_snapshot( WireFormat::AircraftList, AIRCRAFT_LIST.as_bytes(), MissingBatchPolicy::ClearTracks).unwrap();
    for e in &snapshot.entities { println!("{e}") }

    assert_eq!( snapshot.entities.len(), 2);
    assert_eq!( snapshot.skipped.on_ground, 1);

    let e = snapshot.entities.iter().find( |e| &*e.id == "a1b2c3").unwrap();
    assert_eq!( e.label, "DAL42");
    assert!( (e.altitude.unwrap().get::<foot>() - 35000.0).abs() < 1e-6);
    assert!( (e.speed.unwrap().get::<knot>() - 450.0).abs() < 1e-6);
    assert_eq!( e.heading, Some(271.4));
    let lc = e.last_contact.unwrap();
    assert_eq!( lc.timestamp_millis(), 1700000000500 - 1500);

    // no callsign -> registration
    let e = snapshot.entities.iter().find( |e| &*e.id == "c3d4e5").unwrap();
    assert_eq!( e.label, "N88AB");
    assert!( (e.altitude.unwrap().get::<foot>() - 5000.0).abs() < 1e-6);
    assert!( e.heading.is_none());
}

#[test]
fn test_aircraft_list_alt_field() {
    let body = r#"{"aircraft":[{"hex":"a1","lat":41.8,"lon":-87.6}]}"#;
    let snapshot = parse_snapshot( WireFormat::AircraftList, body.as_bytes(), MissingBatchPolicy::RetainTracks).unwrap();
    assert_eq!( snapshot.entities.len(), 1);
    assert_eq!( snapshot.entities[0].label, NO_LABEL);
}

#[test]
fn test_aircraft_list_out_of_range_times() {
    // out of range provider times keep the entity but drop its last contact
    let body = r#"{"now":1700000000.0,"ac":[
      {"hex":"abc123","lat":41.9,"lon":-87.7,"alt_baro":3000,"seen":1e20},
      {"hex":"abc124","lat":41.9,"lon":-87.6,"alt_baro":3000,"seen":-1e20},
      {"hex":"abc125","lat":41.9,"lon":-87.5,"alt_baro":3000,"seen":9.2e15},
      {"hex":"abc126","lat":41.9,"lon":-87.4,"alt_baro":3000,"seen":2.0}
    ]}"#;
    let snapshot = parse_snapshot( WireFormat::AircraftList, body.as_bytes(), MissingBatchPolicy::ClearTracks).unwrap();
    for e in &snapshot.entities { println!("{e}") }
    assert_eq!( snapshot.entities.len(), 4);
    for id in ["abc123", "abc124", "abc125"] {
        let e = snapshot.entities.iter().find( |e| &*e.id == id).unwrap();
        assert!( e.last_contact.is_none(), "{id} has last contact");
    }
    let e = snapshot.entities.iter().find( |e| &*e.id == "abc126").unwrap();
    assert_eq!( e.last_contact.unwrap().timestamp_millis(), 1700000000000 - 2000);

    for now in ["1e300", "-1e300", "1e17"] {
        let body = format!( r#"{{"now":{now},"ac":[{{"hex":"abc123","lat":41.9,"lon":-87.7,"alt_baro":3000,"seen":1.0}}]}}"#);
        let snapshot = parse_snapshot( WireFormat::AircraftList, body.as_bytes(), MissingBatchPolicy::ClearTracks).unwrap();
        assert_eq!( snapshot.entities.len(), 1);
        assert!( snapshot.entities[0].last_contact.is_none(), "now {now}");
    }
}

#[test]
fn test_aviationstack() {
    let snapshot = parse_snapshot( WireFormat::AviationStack, AVIATIONSTACK.as_bytes(), MissingBatchPolicy::ClearTracks).unwrap();
    for e in &snapshot.entities { println!("{e}") }

    assert_eq!( snapshot.entities.len(), 1);
    assert_eq!( snapshot.skipped.no_position, 1);

    let e = &snapshot.entities[0];
    assert_eq!( &*e.id, "a0b1c2");
    assert_eq!( e.label, "AAL100");
    assert!( (e.speed.unwrap().get::<meter_per_second>() - 250.0).abs() < 1e-6); // 900 km/h
    assert!( (e.altitude.unwrap().get::<meter>() - 9000.0).abs() < 1e-6);
    assert_eq!( e.last_contact.unwrap().timestamp(), 1700000000);
}

#[test]
fn test_partial_records() {
    let records = vec![
        EntityRecord { id: None, lat: Some(41.0), lon: Some(-87.0), ..EntityRecord::default() },
        EntityRecord { id: Some("  ".to_string()), lat: Some(41.0), lon: Some(-87.0), ..EntityRecord::default() },
        EntityRecord { id: Some("a".to_string()), lat: Some(41.0), lon: None, ..EntityRecord::default() },
        EntityRecord { id: Some("b".to_string()), lat: Some(95.0), lon: Some(-87.0), ..EntityRecord::default() },
        EntityRecord { id: Some("c".to_string()), lat: Some(f64::NAN), lon: Some(-87.0), ..EntityRecord::default() },
        EntityRecord { id: Some("d".to_string()), lat: Some(41.0), lon: Some(-87.0), on_ground: Some(true), ..EntityRecord::default() },
        EntityRecord {
            id: Some("e".to_string()),
            label: Some("".to_string()),
            secondary_label: Some("N1E".to_string()),
            lat: Some(41.0), lon: Some(-87.0),
            heading: Some(f64::INFINITY),
            speed: Some( knots(f64::NAN)),
            altitude: Some( meters(100.0)),
            ..EntityRecord::default()
        },
        EntityRecord { id: Some("f".to_string()), lat: Some(41.0), lon: Some(-87.0), ..EntityRecord::default() },
    ];

    let (batch, skipped) = normalize_batch( records);
    println!("{skipped:?}");
    assert_eq!( skipped.no_identity, 2);
    assert_eq!( skipped.no_position, 3);
    assert_eq!( skipped.on_ground, 1);
    assert_eq!( batch.len(), 2);

    let e = &batch[0];
    assert_eq!( &*e.id, "e");
    assert_eq!( e.label, "N1E");
    assert!( e.heading.is_none());
    assert!( e.speed.is_none());
    assert!( e.altitude.is_some());
    assert_eq!( e.heading_or_zero(), 0.0);

    assert_eq!( batch[1].label, NO_LABEL);
}
