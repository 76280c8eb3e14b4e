//! A [`RoutingOracle`] backed by an OSRM HTTP endpoint.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use log::debug;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::cancel::Cancellation;
use crate::geo::{try_from_seconds, Coordinate, LineString};
use crate::oracle::{require_legs, Legs, Matrix, MatrixParams, OracleError, Profile, Route, RoutingOracle};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OsrmOracle {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct OsrmEnvelope {
    code: String,
    message: Option<String>,
}

#[derive(Deserialize)]
struct OsrmRouteResponse {
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    legs: Vec<OsrmLeg>,
    geometry: Option<OsrmGeometry>,
}

#[derive(Deserialize)]
struct OsrmLeg {
    duration: f64,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>, // [lng, lat]
}

#[derive(Deserialize)]
struct OsrmTableResponse {
    durations: Vec<Vec<Option<f64>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

#[derive(Deserialize)]
struct OsrmNearestResponse {
    waypoints: Vec<OsrmWaypoint>,
}

#[derive(Deserialize)]
struct OsrmWaypoint {
    location: [f64; 2], // [lng, lat]
}

impl OsrmOracle {
    /// Creates an oracle for the given endpoint (e.g. `http://localhost:5000`).
    pub fn new(endpoint: &str) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| OracleError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, service: &str, profile: Profile, coordinates: &[Coordinate]) -> Result<Url, OracleError> {
        let segment = coordinates
            .iter()
            .map(|c| format!("{},{}", c.lng(), c.lat()))
            .collect::<Vec<_>>()
            .join(";");

        let base = format!("{}/{}/v1/{}/{}", self.endpoint, service, profile, segment);
        Url::parse(&base).map_err(|err| OracleError::InvalidRequest(format!("failed to build OSRM URL: {}", err)))
    }

    /// Issues the request, honouring the cancellation deadline, and
    /// decodes a successful body into `T`.
    fn fetch<T: DeserializeOwned>(&self, ctx: &Cancellation, url: Url) -> Result<T, OracleError> {
        ctx.check()?;
        debug!("OSRM request: {}", url);

        let mut request = self.client.get(url);
        if let Some(remaining) = ctx.remaining() {
            request = request.timeout(remaining.min(REQUEST_TIMEOUT));
        }

        let body = request
            .send()
            .and_then(|response| response.text())
            .map_err(|err| classify(ctx, err))?;

        let envelope: OsrmEnvelope =
            serde_json::from_str(&body).map_err(|err| OracleError::Malformed(err.to_string()))?;
        if envelope.code != "Ok" {
            return Err(OracleError::Status {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        serde_json::from_str(&body).map_err(|err| OracleError::Malformed(err.to_string()))
    }

    fn route(
        &self,
        ctx: &Cancellation,
        profile: Profile,
        waypoints: &[Coordinate],
        geometry: bool,
    ) -> Result<OsrmRoute, OracleError> {
        require_legs(waypoints)?;

        let mut url = self.url("route", profile, waypoints)?;
        url.query_pairs_mut()
            .append_pair("overview", if geometry { "full" } else { "false" })
            .append_pair("geometries", "geojson");

        self.fetch::<OsrmRouteResponse>(ctx, url)?
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Malformed("response carried no routes".to_string()))
    }
}

fn classify(ctx: &Cancellation, err: reqwest::Error) -> OracleError {
    if err.is_timeout() && ctx.remaining().is_some_and(|left| left.is_zero()) {
        return OracleError::DeadlineExceeded;
    }

    if err.is_connect() {
        return OracleError::Unreachable(err.to_string());
    }

    OracleError::Transport(err.to_string())
}

fn to_coordinate([lng, lat]: [f64; 2]) -> Result<Coordinate, OracleError> {
    Coordinate::new(lat, lng).map_err(|err| OracleError::Malformed(err.to_string()))
}

fn to_duration(seconds: f64) -> Result<TimeDelta, OracleError> {
    try_from_seconds(seconds).map_err(|err| OracleError::Malformed(err.to_string()))
}

fn to_legs(route: &OsrmRoute) -> Result<Legs, OracleError> {
    route.legs.iter().map(|leg| to_duration(leg.duration)).collect()
}

impl RoutingOracle for OsrmOracle {
    fn plan_driving_route(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        _departure: DateTime<Utc>,
    ) -> Result<Route, OracleError> {
        let route = self.route(ctx, Profile::Auto, waypoints, true)?;

        let polyline = route
            .geometry
            .as_ref()
            .map(|geometry| {
                geometry
                    .coordinates
                    .iter()
                    .copied()
                    .map(to_coordinate)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_else(|| waypoints.to_vec());

        Ok(Route {
            polyline: LineString::new(polyline),
            legs: to_legs(&route)?,
            distance: route.distance,
        })
    }

    fn compute_driving_time(
        &self,
        ctx: &Cancellation,
        waypoints: &[Coordinate],
        _departure: DateTime<Utc>,
    ) -> Result<Legs, OracleError> {
        let route = self.route(ctx, Profile::Auto, waypoints, false)?;
        to_legs(&route)
    }

    fn compute_walking_time(
        &self,
        ctx: &Cancellation,
        from: &Coordinate,
        to: &Coordinate,
    ) -> Result<TimeDelta, OracleError> {
        let route = self.route(ctx, Profile::Pedestrian, &[*from, *to], false)?;
        Ok(to_legs(&route)?.iter().fold(TimeDelta::zero(), |total, leg| total + *leg))
    }

    fn compute_distance_time_matrix(
        &self,
        ctx: &Cancellation,
        params: &MatrixParams,
    ) -> Result<Matrix, OracleError> {
        if params.sources.is_empty() || params.targets.is_empty() {
            return Err(OracleError::InvalidRequest("empty matrix query".to_string()));
        }

        let coordinates = params
            .sources
            .iter()
            .chain(params.targets.iter())
            .copied()
            .collect::<Vec<_>>();

        let join = |range: std::ops::Range<usize>| range.map(|i| i.to_string()).collect::<Vec<_>>().join(";");
        let sources = params.sources.len();

        let mut url = self.url("table", params.profile, &coordinates)?;
        url.query_pairs_mut()
            .append_pair("sources", &join(0..sources))
            .append_pair("destinations", &join(sources..coordinates.len()))
            .append_pair("annotations", "duration,distance");

        let table = self.fetch::<OsrmTableResponse>(ctx, url)?;

        // Unroutable cells are reported as `null`, and treated as unreachable.
        let times = table
            .durations
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.map_or(Ok(TimeDelta::MAX), to_duration))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let distances = table
            .distances
            .unwrap_or_default()
            .iter()
            .map(|row| row.iter().map(|cell| cell.unwrap_or(f64::INFINITY)).collect())
            .collect();

        Ok(Matrix::new(times, distances))
    }

    fn snap_point_to_road(&self, ctx: &Cancellation, point: &Coordinate) -> Result<Coordinate, OracleError> {
        let mut url = self.url("nearest", Profile::Auto, &[*point])?;
        url.query_pairs_mut().append_pair("number", "1");

        self.fetch::<OsrmNearestResponse>(ctx, url)?
            .waypoints
            .first()
            .map(|waypoint| to_coordinate(waypoint.location))
            .unwrap_or_else(|| Err(OracleError::Malformed("response carried no waypoints".to_string())))
    }
}
