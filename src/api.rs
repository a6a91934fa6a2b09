pub mod client;
pub mod forecast_solar;
pub mod influx;
pub mod inverter;
pub mod octopus;
