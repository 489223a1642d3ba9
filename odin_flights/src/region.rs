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

///! geographic primitives for the areas we poll: positions, [s,n,w,e] bounding boxes and named regions

use std::fmt;
use serde::{Serialize,Deserialize};
use geo::{Distance, Haversine, Point};
use uom::si::{f64::Length, length::{meter,kilometer,nautical_mile}};

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct GeoPos {
    pub lat: f64, // degrees
    #[serde(alias="lng")]
    pub lon: f64, // degrees
}

impl GeoPos {
    pub fn new (lat: f64, lon: f64)->Self { GeoPos{lat,lon} }

    /// finite and within [-90,90] / [-180,180]
    pub fn is_valid (&self)->bool {
        self.lat.is_finite() && self.lon.is_finite() && self.lat.abs() <= 90.0 && self.lon.abs() <= 180.0
    }

    pub fn to_point (&self)->Point { Point::new( self.lon, self.lat) }

    /// great circle (haversine) distance
    pub fn distance_to (&self, other: &GeoPos)->Length {
        let dist = Haversine.distance( self.to_point(), other.to_point());
        Length::new::<meter>(dist)
    }
}

impl fmt::Display for GeoPos {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "({:.5},{:.5})", self.lat, self.lon)
    }
}

/// a lat/lon aligned rectangle. The serialized form is the `[south,north,west,east]` array we use in configs
#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
#[serde(from="[f64;4]", into="[f64;4]")]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new (south: f64, north: f64, west: f64, east: f64)->Self {
        BoundingBox{ south, north, west, east }
    }

    pub fn contains (&self, p: &GeoPos)->bool {
        p.lat >= self.south && p.lat <= self.north && p.lon >= self.west && p.lon <= self.east
    }

    pub fn center (&self)->GeoPos {
        GeoPos::new( (self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    pub fn is_valid (&self)->bool {
        GeoPos::new( self.south, self.west).is_valid() && GeoPos::new( self.north, self.east).is_valid()
            && self.south < self.north && self.west < self.east
    }

    pub fn corners (&self)->[GeoPos;4] {
        [ GeoPos::new( self.south, self.west), GeoPos::new( self.south, self.east),
          GeoPos::new( self.north, self.east), GeoPos::new( self.north, self.west) ]
    }
}

impl From<[f64;4]> for BoundingBox {
    fn from (a: [f64;4])->Self { BoundingBox::new( a[0], a[1], a[2], a[3]) }
}

impl From<BoundingBox> for [f64;4] {
    fn from (bbox: BoundingBox)->Self { [bbox.south, bbox.north, bbox.west, bbox.east] }
}

impl fmt::Display for BoundingBox {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "[s:{},n:{},w:{},e:{}]", self.south, self.north, self.west, self.east)
    }
}

/// a named, selectable area of interest
#[derive(Debug,Clone,PartialEq,Serialize,Deserialize)]
pub struct Region {
    pub name: String,
    pub center: GeoPos,
    pub bbox: BoundingBox,
}

impl Region {
    pub fn new (name: impl ToString, center: GeoPos, bbox: BoundingBox)->Self {
        Region { name: name.to_string(), center, bbox }
    }

    /// the smallest radius around our center that still covers the whole bbox
    pub fn radius (&self)->Length {
        self.bbox.corners().iter()
            .map( |p| self.center.distance_to(p))
            .fold( Length::new::<meter>(0.0), |acc,d| if d > acc { d } else { acc })
    }

    pub fn query (&self, use_radius: bool)->RegionQuery {
        if use_radius {
            RegionQuery::CenterRadius { center: self.center, radius: self.radius() }
        } else {
            RegionQuery::BoundingBox( self.bbox)
        }
    }
}

/// the two ways providers want to be asked for an area
#[derive(Debug,Clone,Copy,PartialEq)]
pub enum RegionQuery {
    BoundingBox( BoundingBox),
    CenterRadius { center: GeoPos, radius: Length }
}

impl fmt::Display for RegionQuery {
    fn fmt (&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionQuery::BoundingBox(bbox) => write!( f, "bbox {}", bbox),
            RegionQuery::CenterRadius{center,radius} => {
                write!( f, "{} r={:.1}km ({:.1}nm)", center, radius.get::<kilometer>(), radius.get::<nautical_mile>())
            }
        }
    }
}
