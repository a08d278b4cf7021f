//! Read-time line views derived from a single bookmaker.

use serde::Serialize;

/// Home/away spread as quoted by one bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadLine {
    pub bookmaker_title: String,
    pub home_point: f64,
    pub home_price: i32,
    pub away_point: f64,
    pub away_price: i32,
}

/// Over/under total as quoted by one bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalLine {
    pub bookmaker_title: String,
    pub over_point: f64,
    pub over_price: i32,
    pub under_point: f64,
    pub under_price: i32,
}
