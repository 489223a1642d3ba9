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

///! snapshot retrieval from live providers and normalization of their (heterogeneous) record shapes

use std::{sync::Arc, time::Duration};
use async_trait::async_trait;
use chrono::{DateTime,Utc};
use reqwest::{Client,RequestBuilder};
use serde::{Serialize,Deserialize};
use serde_json::{Map,Value};
use tracing::{debug,warn};
use uom::si::{f64::Velocity, length::nautical_mile, velocity::kilometer_per_hour};

use crate::{
    FlightsConfig,
    errors::{FetchError,OdinFlightsError,Result,config_error},
    record::{EntityRecord,NormalizedEntityState,SkipCounts,normalize_batch,meters,feet,meters_per_second,knots},
    region::Region,
    simulated::SimulatedFetcher,
};

/// the source of a batch of entity states for a region. Implementations do not retry - that is up to the
/// poll scheduler
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch (&self, region: &Region)->std::result::Result<Vec<NormalizedEntityState>,FetchError>;
}

/// where we get our snapshots from
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub enum Provider {
    /// OpenSky network `states/all` REST endpoint, queried by bounding box
    OpenSky { base_url: String },

    /// readsb/tar1090 style aggregator API, queried by center point and radius
    AircraftList { base_url: String },

    /// aviationstack `flights` endpoint. Has no geographic query, we filter by bbox
    AviationStack { base_url: String, access_key: String },

    /// synthetic traffic circling the region center
    Simulated { n_aircraft: usize, step: Duration },
}

impl Provider {
    pub fn wire_format (&self)->Option<WireFormat> {
        match self {
            Provider::OpenSky{..} => Some(WireFormat::OpenSky),
            Provider::AircraftList{..} => Some(WireFormat::AircraftList),
            Provider::AviationStack{..} => Some(WireFormat::AviationStack),
            Provider::Simulated{..} => None
        }
    }
}

/// the payload shapes we know how to decode
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum WireFormat {
    OpenSky,
    AircraftList,
    AviationStack,
}

impl WireFormat {
    /// the payload field(s) that hold the record array
    pub fn batch_fields (&self)->&'static [&'static str] {
        match self {
            WireFormat::OpenSky => &["states"],
            WireFormat::AircraftList => &["ac", "aircraft"],
            WireFormat::AviationStack => &["data"],
        }
    }
}

/// what to do if a response parses but has no batch field
#[derive(Debug,Clone,Copy,PartialEq,Eq,Default,Serialize,Deserialize)]
pub enum MissingBatchPolicy {
    /// treat as empty batch, which removes all current tracks
    #[default]
    ClearTracks,
    /// report as `FetchError::MalformedPayload` so that current tracks are retained
    RetainTracks,
}

/// decoded records of one payload
#[derive(Debug,Clone,Default,PartialEq)]
pub struct RawBatch {
    pub records: Vec<EntityRecord>,
    pub malformed: usize, // records we could not decode at all
}

/// result of normalizing a payload
#[derive(Debug,Clone,Default,PartialEq)]
pub struct Snapshot {
    pub entities: Vec<NormalizedEntityState>,
    pub skipped: SkipCounts,
    pub malformed: usize,
    pub missing_batch: bool,
}

/* #region payload decoding ******************************************************************************/

/// decode a response body. Returns `Ok(None)` if the payload is a JSON object without batch field
pub fn decode_records (format: WireFormat, body: &[u8])->std::result::Result<Option<RawBatch>,FetchError> {
    let root: Value = serde_json::from_slice( body)?;
    let Value::Object(obj) = root else {
        return Err( FetchError::MalformedPayload( "payload is not a JSON object".to_string()))
    };

    let Some(items) = batch_array( &obj, format.batch_fields()) else { return Ok(None) };

    let mut batch = RawBatch { records: Vec::with_capacity( items.len()), malformed: 0 };
    let now = reference_time( &obj);

    for item in items {
        let rec = match format {
            WireFormat::OpenSky => decode_opensky_state( item),
            WireFormat::AircraftList => decode_list_aircraft( item, now),
            WireFormat::AviationStack => decode_aviationstack_flight( item),
        };
        match rec {
            Some(rec) => batch.records.push( rec),
            None => batch.malformed += 1
        }
    }

    Ok(Some(batch))
}

/// decode and normalize a response body according to the missing batch `policy`
pub fn parse_snapshot (format: WireFormat, body: &[u8], policy: MissingBatchPolicy)->std::result::Result<Snapshot,FetchError> {
    match decode_records( format, body)? {
        Some(raw) => {
            let (entities, skipped) = normalize_batch( raw.records);
            Ok( Snapshot { entities, skipped, malformed: raw.malformed, missing_batch: false } )
        }
        None => match policy {
            MissingBatchPolicy::ClearTracks => {
                warn!("payload has no {:?} field, treating as empty batch", format.batch_fields());
                Ok( Snapshot { missing_batch: true, ..Snapshot::default() } )
            }
            MissingBatchPolicy::RetainTracks => {
                Err( FetchError::MalformedPayload( format!("missing batch field {:?}", format.batch_fields())))
            }
        }
    }
}

// a present but null field is a valid empty batch (OpenSky reports "states":null if there is nothing in the area)
fn batch_array<'a> (obj: &'a Map<String,Value>, fields: &[&str])->Option<&'a [Value]> {
    for field in fields {
        match obj.get( *field) {
            Some(Value::Array(a)) => return Some( a.as_slice()),
            Some(Value::Null) => return Some( &[]),
            _ => {}
        }
    }
    None
}

// aggregators report "now" as epoch seconds (fractional) and per-record "seen" as seconds before that
fn reference_time (obj: &Map<String,Value>)->Option<DateTime<Utc>> {
    let now = obj.get("now").and_then( Value::as_f64)?;
    let millis = if now > 1e11 { now } else { now * 1000.0 };
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 { return None }
    DateTime::from_timestamp_millis( millis as i64)
}

/// `now` minus `seen` seconds, or None if provider values are out of range
fn seen_before (now: DateTime<Utc>, seen: f64)->Option<DateTime<Utc>> {
    let millis = seen * 1000.0;
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 { return None }
    let dt = chrono::Duration::try_milliseconds( millis as i64)?;
    now.checked_sub_signed( dt)
}

fn opt_f64 (v: Option<&Value>)->Option<f64> { v.and_then( Value::as_f64) }
fn opt_string (v: Option<&Value>)->Option<String> { v.and_then( Value::as_str).map( str::to_string) }

/// OpenSky state vector array:
/// `[icao24, callsign, origin_country, time_position, last_contact, lon, lat, baro_altitude, on_ground,
///   velocity, true_track, vertical_rate, sensors, geo_altitude, squawk, spi, position_source]`
pub fn decode_opensky_state (v: &Value)->Option<EntityRecord> {
    let a = v.as_array()?;
    if a.len() < 11 { return None }

    let altitude = opt_f64( a.get(7)).or_else( || opt_f64( a.get(13))).map( meters);

    Some( EntityRecord {
        id: opt_string( a.get(0)),
        label: opt_string( a.get(1)),
        secondary_label: None,
        lon: opt_f64( a.get(5)),
        lat: opt_f64( a.get(6)),
        altitude,
        speed: opt_f64( a.get(9)).map( meters_per_second),
        heading: opt_f64( a.get(10)),
        on_ground: a.get(8).and_then( Value::as_bool),
        last_contact: a.get(4).and_then( Value::as_i64).and_then( |s| DateTime::from_timestamp( s, 0)),
    })
}

#[derive(Deserialize,Debug)]
struct ListAircraft {
    hex: Option<String>,
    flight: Option<String>,
    r: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    alt_baro: Option<Value>, // feet or "ground"
    alt_geom: Option<f64>,
    gs: Option<f64>,         // knots
    track: Option<f64>,
    true_heading: Option<f64>,
    seen: Option<f64>,
}

/// readsb/tar1090 aircraft entry (feet, knots)
pub fn decode_list_aircraft (v: &Value, now: Option<DateTime<Utc>>)->Option<EntityRecord> {
    let ac: ListAircraft = serde_json::from_value( v.clone()).ok()?;

    let (on_ground, baro) = match &ac.alt_baro {
        Some(Value::String(s)) if s == "ground" => (Some(true), None),
        Some(Value::Number(n)) => (Some(false), n.as_f64()),
        _ => (None, None)
    };
    let last_contact = match (now, ac.seen) {
        (Some(now), Some(seen)) => seen_before( now, seen),
        _ => None
    };

    Some( EntityRecord {
        id: ac.hex,
        label: ac.flight,
        secondary_label: ac.r,
        lat: ac.lat,
        lon: ac.lon,
        altitude: baro.or( ac.alt_geom).map( feet),
        speed: ac.gs.map( knots),
        heading: ac.track.or( ac.true_heading),
        on_ground,
        last_contact,
    })
}

#[derive(Deserialize,Debug,Default)]
struct AsFlightId { icao: Option<String>, iata: Option<String> }

#[derive(Deserialize,Debug,Default)]
struct AsAircraft { icao24: Option<String>, registration: Option<String> }

#[derive(Deserialize,Debug)]
struct AsLive {
    updated: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,         // meters
    direction: Option<f64>,
    speed_horizontal: Option<f64>, // km/h
    is_ground: Option<bool>,
}

#[derive(Deserialize,Debug)]
struct AsFlight {
    flight: Option<AsFlightId>,
    aircraft: Option<AsAircraft>,
    live: Option<AsLive>,
}

/// aviationstack flight entry (meters, km/h). Entries without `live` data have no position
pub fn decode_aviationstack_flight (v: &Value)->Option<EntityRecord> {
    let f: AsFlight = serde_json::from_value( v.clone()).ok()?;
    let flight = f.flight.unwrap_or_default();
    let aircraft = f.aircraft.unwrap_or_default();

    let mut rec = EntityRecord {
        id: aircraft.icao24.map( |s| s.to_lowercase()),
        label: flight.icao,
        secondary_label: aircraft.registration.or( flight.iata),
        ..EntityRecord::default()
    };

    if let Some(live) = f.live {
        rec.lat = live.latitude;
        rec.lon = live.longitude;
        rec.altitude = live.altitude.map( meters);
        rec.speed = live.speed_horizontal.map( |s| Velocity::new::<kilometer_per_hour>(s));
        rec.heading = live.direction;
        rec.on_ground = live.is_ground;
        rec.last_contact = live.updated.and_then( |s| DateTime::parse_from_rfc3339( &s).ok()).map( |d| d.with_timezone(&Utc));
    }

    Some(rec)
}

/* #endregion payload decoding */

/* #region live fetcher **********************************************************************************/

/// an HTTP(S) based fetcher for the OpenSky, AircraftList and AviationStack providers
pub struct LiveFetcher {
    client: Client,
    provider: Provider,
    format: WireFormat,
    policy: MissingBatchPolicy,
}

impl LiveFetcher {
    pub fn new (config: &FlightsConfig)->Result<Self> {
        let format = config.provider.wire_format()
            .ok_or_else( || config_error!("provider {:?} is not a network provider", config.provider))?;

        let client = Client::builder()
            .timeout( config.request_timeout)
            .user_agent( concat!( env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err( |e| config_error!("failed to create http client: {e}"))?;

        Ok( LiveFetcher { client, provider: config.provider.clone(), format, policy: config.missing_batch } )
    }

    pub fn provider (&self)->&Provider { &self.provider }

    fn request (&self, region: &Region)->Option<RequestBuilder> {
        let req = match &self.provider {
            Provider::OpenSky { base_url } => {
                let bbox = &region.bbox;
                self.client.get( base_url.as_str())
                    .query( &[("lamin", bbox.south), ("lomin", bbox.west), ("lamax", bbox.north), ("lomax", bbox.east)])
            }
            Provider::AircraftList { base_url } => {
                let radius_nm = region.radius().get::<nautical_mile>().ceil().clamp( 1.0, 250.0) as u32;
                let url = format!("{}/point/{:.4}/{:.4}/{}", base_url.trim_end_matches('/'), region.center.lat, region.center.lon, radius_nm);
                self.client.get( url)
            }
            Provider::AviationStack { base_url, access_key } => {
                self.client.get( base_url.as_str())
                    .query( &[("access_key", access_key.as_str()), ("flight_status", "active")])
            }
            Provider::Simulated{..} => return None
        };
        Some(req)
    }
}

#[async_trait]
impl SnapshotFetcher for LiveFetcher {
    async fn fetch (&self, region: &Region)->std::result::Result<Vec<NormalizedEntityState>,FetchError> {
        let request = self.request( region)
            .ok_or_else( || FetchError::Network( format!("no endpoint for provider {:?}", self.provider)))?;
        debug!("requesting {}: {}", region.name, region.query( self.format == WireFormat::AircraftList));
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err( FetchError::BadStatus( status.as_u16()))
        }

        let body = response.bytes().await?;
        let mut snapshot = parse_snapshot( self.format, &body, self.policy)?;

        if self.format == WireFormat::AviationStack { // no server side area filter
            snapshot.entities.retain( |e| e.position.map( |p| region.bbox.contains(&p)).unwrap_or(false));
        }

        if snapshot.skipped.total() > 0 || snapshot.malformed > 0 {
            debug!("{}: skipped {:?}, {} malformed records", region.name, snapshot.skipped, snapshot.malformed);
        }
        Ok( snapshot.entities)
    }
}

/* #endregion live fetcher */

/// create the fetcher for the configured provider
pub fn create_fetcher (config: &FlightsConfig)->Result<Arc<dyn SnapshotFetcher>> {
    match &config.provider {
        Provider::Simulated { n_aircraft, step } => Ok( Arc::new( SimulatedFetcher::new( *n_aircraft, *step))),
        _ => Ok( Arc::new( LiveFetcher::new( config)?))
    }
}
