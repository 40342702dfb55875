pub mod ice_connection_state;
