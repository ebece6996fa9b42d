mod bus;
mod http;
mod overlays;
mod persistence;
mod routing;
mod state;
