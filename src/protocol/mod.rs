//! Bus protocol implementations: J1939 transport and network
//! management, trouble-code collection, and the two bus decoders.
pub mod dtc;
pub mod j1587;
pub mod j1939;
pub mod managment;
pub mod transport;
