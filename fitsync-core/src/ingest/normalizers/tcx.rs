//! TCX track file reader
//!
//! Each logged activity has a `<logId>.xml` file in the Training Center
//! format:
//!
//! ```xml
//! <TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
//!   <Activities>
//!     <Activity Sport="Running">
//!       <Lap StartTime="...">
//!         <Track>
//!           <Trackpoint>
//!             <Time>2019-07-16T06:11:35.000+05:30</Time>
//!             <Position>
//!               <LatitudeDegrees>12.97</LatitudeDegrees>
//!               <LongitudeDegrees>77.59</LongitudeDegrees>
//!             </Position>
//!             <AltitudeMeters>915.2</AltitudeMeters>
//!             <DistanceMeters>10.4</DistanceMeters>
//!             <HeartRateBpm><Value>121</Value></HeartRateBpm>
//!           </Trackpoint>
//! ```
//!
//! Elements are matched by local name, so the namespace prefix never
//! matters. Points are truncated to whole seconds and de-duplicated per
//! second, the last point in document order winning.

use crate::error::{Error, Result};
use crate::ingest::timeline::Timeline;
use crate::ingest::timestamps;
use crate::types::{ActivityTrackPoint, GeoPoint};
use chrono::{NaiveDateTime, SubsecRound};
use roxmltree::Node;
use std::collections::HashMap;
use std::path::Path;

/// Parse a TCX document into time-ordered, per-second track points.
pub fn parse_track(path: &Path, content: &str, activity_id: i64) -> Result<Vec<ActivityTrackPoint>> {
    let file = file_label(path);
    let doc = roxmltree::Document::parse(content).map_err(|e| Error::Xml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut timeline: Timeline<NaiveDateTime, ActivityTrackPoint> = Timeline::new();
    let mut raw_points = 0usize;

    for activities in children_named(doc.root_element(), "Activities") {
        for activity in children_named(activities, "Activity") {
            for lap in children_named(activity, "Lap") {
                for track in children_named(lap, "Track") {
                    for node in track.children().filter(|n| n.is_element()) {
                        if node.tag_name().name() != "Trackpoint" {
                            return Err(Error::schema(
                                &file,
                                format!(
                                    "unexpected <{}> inside <Track>",
                                    node.tag_name().name()
                                ),
                            ));
                        }
                        let point = parse_trackpoint(&file, node, activity_id)?;
                        raw_points += 1;
                        timeline.insert(point.time_stamp, point);
                    }
                }
            }
        }
    }

    if timeline.is_empty() {
        tracing::warn!(activity_id, file = %file, "Track file holds no trackpoints");
    } else {
        tracing::debug!(
            activity_id,
            raw_points,
            kept = timeline.len(),
            "Parsed track file"
        );
    }

    Ok(timeline.into_values())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn children_named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

/// Child elements keyed by their bare (namespace-free) name.
fn index_children<'a, 'input>(node: Node<'a, 'input>) -> HashMap<&'input str, Node<'a, 'input>> {
    node.children()
        .filter(|n| n.is_element())
        .map(|n| (n.tag_name().name(), n))
        .collect()
}

fn text_of<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.text().map(str::trim).filter(|t| !t.is_empty())
}

fn parse_number<T: std::str::FromStr>(file: &str, field: &str, node: Node) -> Result<Option<T>> {
    match text_of(node) {
        Some(text) => text.parse().map(Some).map_err(|_| {
            Error::schema(file, format!("{} is not a number: \"{}\"", field, text))
        }),
        None => Ok(None),
    }
}

fn parse_trackpoint(file: &str, node: Node, activity_id: i64) -> Result<ActivityTrackPoint> {
    let fields = index_children(node);

    let time = fields
        .get("Time")
        .and_then(|n| text_of(*n))
        .ok_or_else(|| Error::schema(file, "Trackpoint without <Time>"))?;
    let time_stamp = timestamps::parse_local_datetime(time)?.trunc_subsecs(0);

    let position = match fields.get("Position") {
        Some(position) => {
            let coords = index_children(*position);
            let latitude = match coords.get("LatitudeDegrees") {
                Some(n) => parse_number::<f64>(file, "LatitudeDegrees", *n)?,
                None => None,
            };
            let longitude = match coords.get("LongitudeDegrees") {
                Some(n) => parse_number::<f64>(file, "LongitudeDegrees", *n)?,
                None => None,
            };
            latitude
                .zip(longitude)
                .map(|(latitude, longitude)| GeoPoint {
                    latitude,
                    longitude,
                })
        }
        None => None,
    };

    let altitude = match fields.get("AltitudeMeters") {
        Some(n) => parse_number::<f64>(file, "AltitudeMeters", *n)?,
        None => None,
    };
    let distance = match fields.get("DistanceMeters") {
        Some(n) => parse_number::<f64>(file, "DistanceMeters", *n)?,
        None => None,
    };
    let heart_rate = match fields
        .get("HeartRateBpm")
        .and_then(|bpm| index_children(*bpm).get("Value").copied())
    {
        Some(n) => parse_number::<i32>(file, "HeartRateBpm", n)?,
        None => None,
    };

    Ok(ActivityTrackPoint {
        activity_id,
        time_stamp,
        position,
        altitude,
        distance,
        heart_rate,
    })
}
