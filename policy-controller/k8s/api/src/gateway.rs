//! Flat re-export of the Gateway API resources this controller attaches
//! policies to.

pub use gateway_api::apis::standard::{
    gateways::*, grpcroutes::*, httproutes::*, referencegrants::*,
};
