// example/src/main.rs

use brine_tl::{from_bytes, to_bytes, WireError};

use example_app::api::ton::tonlib_api as api;
use example_app::native::ton::details as native;

fn main() -> Result<(), WireError> {
    // Build the options with the native creators.
    let options = native::TLDoptions {
        config: Some(native::TLDconfig {
            config:                    "{}".to_string(),
            blockchain_name:           "mainnet".to_string(),
            use_callbacks_for_network: native::create::make_boolTrue(),
            ignore_cache:              native::create::make_boolFalse(),
        }),
        keystore_type: native::create::make_keyStoreTypeDirectory("/tmp/keys".to_string()),
    };

    // Both schemas share the wire format of the types they have in common.
    let bytes = to_bytes(&options)?;
    let public: api::TLDoptions = from_bytes(&bytes)?;
    println!("options ({} bytes) = {:?}", bytes.len(), public);

    // Converting gives the same value without a trip through bytes.
    let converted = api::TLDoptions::from(options.clone());
    assert_eq!(converted, public);

    if let Some(config) = &converted.config {
        println!("use_callbacks_for_network = {}", config.use_callbacks_for_network);
        println!("ignore_cache             = {}", config.ignore_cache);
    }

    let request = api::make_deleteKey(api::TLDkey {
        public_key: "Pub".to_string(),
        secret:     api::TLsecureBytes::new(b"secret".to_vec()),
    });
    println!("deleteKey request = {:02x?}", to_bytes(&request)?);

    Ok(())
}
