//! Code generated from `schema/api.tl` and `schema/native.tl` by the build
//! script.

pub mod api {
    include!(concat!(env!("OUT_DIR"), "/api.rs"));
}

pub mod native {
    include!(concat!(env!("OUT_DIR"), "/native.rs"));
}
