//! SAE J1939 NAME field implementation (64 bits). The NAME uniquely
//! identifies an electronic control unit on the vehicle network and
//! doubles as the tie-breaker during address-claim contention: the
//! numerically lower NAME keeps the contested address. The module
//! provides a typed wrapper around the raw `u64` plus safe
//! accessors/builders.
//!
//! # Bit layout (Little Endian order)
//!
//! ```text
//! Bits  0-20  (21 bits) : Identity number
//! Bits 21-31  (11 bits) : Manufacturer code
//! Bits 32-34  ( 3 bits) : ECU instance
//! Bits 35-39  ( 5 bits) : Function instance
//! Bits 40-47  ( 8 bits) : Function
//! Bit  48     ( 1 bit ) : Reserved
//! Bits 49-55  ( 7 bits) : Vehicle system
//! Bits 56-59  ( 4 bits) : Vehicle system instance
//! Bits 60-62  ( 3 bits) : Industry group
//! Bit  63     ( 1 bit ) : Arbitrary Address Capable
//! ```

use core::fmt;

/// Wrapper around the SAE J1939 NAME field (64 bits).
///
/// # Example
///
/// ```
/// use hv_vbus::protocol::managment::node_name::NodeName;
///
/// let name = NodeName::builder()
///     .identity_number(123456)
///     .manufacturer_code(718)
///     .function(20)
///     .arbitrary_address_capable(true)
///     .build();
///
/// assert_eq!(name.identity_number(), 123456);
/// assert_eq!(name.manufacturer_code(), 718);
/// assert!(name.is_arbitrary_address_capable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeName(u64);

impl NodeName {
    /// Build a `NodeName` from the raw value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the underlying `u64`.
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Create a builder to construct a `NodeName`.
    #[inline]
    pub const fn builder() -> NodeNameBuilder {
        NodeNameBuilder::new()
    }

    /// Reconstruct a NAME from the 8 data bytes of a claim frame.
    #[inline]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    /// Wire representation used in address-claim frames.
    #[inline]
    pub const fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    // Individual accessors for NAME sub-fields.

    /// Identity number (bits 0-20, 21 bits).
    ///
    /// Distinguishes the unit within the manufacturer lineup.
    #[inline]
    pub const fn identity_number(&self) -> u32 {
        (self.0 & 0x1F_FFFF) as u32
    }

    /// Manufacturer code (bits 21-31, 11 bits).
    #[inline]
    pub const fn manufacturer_code(&self) -> u16 {
        ((self.0 >> 21) & 0x7FF) as u16
    }

    /// ECU instance (bits 32-34, 3 bits).
    #[inline]
    pub const fn ecu_instance(&self) -> u8 {
        ((self.0 >> 32) & 0x07) as u8
    }

    /// Function instance (bits 35-39, 5 bits).
    #[inline]
    pub const fn function_instance(&self) -> u8 {
        ((self.0 >> 35) & 0x1F) as u8
    }

    /// Function (bits 40-47, 8 bits).
    #[inline]
    pub const fn function(&self) -> u8 {
        ((self.0 >> 40) & 0xFF) as u8
    }

    /// Vehicle system (bits 49-55, 7 bits).
    #[inline]
    pub const fn vehicle_system(&self) -> u8 {
        ((self.0 >> 49) & 0x7F) as u8
    }

    /// Industry group (bits 60-62, 3 bits).
    ///
    /// Typical value: `0` for the global group.
    #[inline]
    pub const fn industry_group(&self) -> u8 {
        ((self.0 >> 60) & 0x07) as u8
    }

    /// Arbitrary Address Capable bit (bit 63).
    ///
    /// Indicates whether the node may claim addresses in the
    /// self-configurable range (128-247).
    #[inline]
    pub const fn is_arbitrary_address_capable(&self) -> bool {
        ((self.0 >> 63) & 0x01) != 0
    }

    /// Contention rule: the numerically lower NAME keeps a contested
    /// address (unsigned comparison of the raw 64 bits).
    #[inline]
    pub const fn outranks(&self, other: &NodeName) -> bool {
        self.0 < other.0
    }
}

impl From<u64> for NodeName {
    #[inline]
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<NodeName> for u64 {
    #[inline]
    fn from(name: NodeName) -> Self {
        name.raw()
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NodeName {{ identity: {}, mfg: {}, func: {}, aac: {} }}",
            self.identity_number(),
            self.manufacturer_code(),
            self.function(),
            self.is_arbitrary_address_capable()
        )
    }
}

/// Fluent builder used to construct a `NodeName`.
#[derive(Debug, Clone, Copy)]
pub struct NodeNameBuilder {
    raw: u64,
}

impl NodeNameBuilder {
    /// Initialize the builder with all fields cleared.
    #[inline]
    pub const fn new() -> Self {
        Self { raw: 0 }
    }

    /// Set the identity number (bits 0-20, 21 bits).
    ///
    /// # Panics
    /// Panics when the value does not fit in 21 bits (> 0x1FFFFF).
    #[inline]
    pub const fn identity_number(mut self, value: u32) -> Self {
        assert!(value <= 0x1F_FFFF, "Identity number must fit in 21 bits");
        self.raw = (self.raw & !0x1F_FFFF) | (value as u64 & 0x1F_FFFF);
        self
    }

    /// Set the manufacturer code (bits 21-31, 11 bits).
    ///
    /// # Panics
    /// Panics when the value exceeds 11 bits (> 0x7FF).
    #[inline]
    pub const fn manufacturer_code(mut self, value: u16) -> Self {
        assert!(value <= 0x7FF, "Manufacturer code must fit in 11 bits");
        self.raw = (self.raw & !(0x7FF << 21)) | ((value as u64 & 0x7FF) << 21);
        self
    }

    /// Set the ECU instance (bits 32-34, 3 bits).
    ///
    /// # Panics
    /// Panics when the value exceeds 3 bits (> 0x07).
    #[inline]
    pub const fn ecu_instance(mut self, value: u8) -> Self {
        assert!(value <= 0x07, "ECU instance must fit in 3 bits");
        self.raw = (self.raw & !(0x07 << 32)) | ((value as u64 & 0x07) << 32);
        self
    }

    /// Set the function instance (bits 35-39, 5 bits).
    ///
    /// # Panics
    /// Panics when the value exceeds 5 bits (> 0x1F).
    #[inline]
    pub const fn function_instance(mut self, value: u8) -> Self {
        assert!(value <= 0x1F, "Function instance must fit in 5 bits");
        self.raw = (self.raw & !(0x1F << 35)) | ((value as u64 & 0x1F) << 35);
        self
    }

    /// Set the function (bits 40-47, 8 bits).
    #[inline]
    pub const fn function(mut self, value: u8) -> Self {
        self.raw = (self.raw & !(0xFF << 40)) | ((value as u64) << 40);
        self
    }

    /// Set the vehicle system (bits 49-55, 7 bits).
    ///
    /// # Panics
    /// Panics when the value exceeds 7 bits (> 0x7F).
    #[inline]
    pub const fn vehicle_system(mut self, value: u8) -> Self {
        assert!(value <= 0x7F, "Vehicle system must fit in 7 bits");
        self.raw = (self.raw & !(0x7F << 49)) | ((value as u64 & 0x7F) << 49);
        self
    }

    /// Set the industry group (bits 60-62, 3 bits).
    ///
    /// # Panics
    /// Panics when the value exceeds 3 bits (> 0x07).
    #[inline]
    pub const fn industry_group(mut self, value: u8) -> Self {
        assert!(value <= 0x07, "Industry group must fit in 3 bits");
        self.raw = (self.raw & !(0x07 << 60)) | ((value as u64 & 0x07) << 60);
        self
    }

    /// Configure the Arbitrary Address Capable bit (bit 63).
    #[inline]
    pub const fn arbitrary_address_capable(mut self, value: bool) -> Self {
        self.raw = (self.raw & !(0x01 << 63)) | ((value as u64) << 63);
        self
    }

    /// Build the final `NodeName`.
    #[inline]
    pub const fn build(self) -> NodeName {
        NodeName(self.raw)
    }
}

impl Default for NodeNameBuilder {
    fn default() -> Self {
        Self::new()
    }
}
