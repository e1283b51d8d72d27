// Word addresses of the device register file. The mapping is the device's
// fixed convention; implementations wiring to a different register map must
// provide their own table rather than reinterpret these.
pub const A_STATUS: u64 = 0;
pub const B_STATUS: u64 = 1;
pub const Y_STATUS: u64 = 2;
pub const Y_OUTPUT: u64 = 3;
pub const A_DATA: u64 = 4;
pub const B_DATA: u64 = 5;

/// Mnemonic for a mapped register address.
pub fn name_of(address: u64) -> Option<&'static str> {
    match address {
        A_STATUS => Some("A_status"),
        B_STATUS => Some("B_status"),
        Y_STATUS => Some("Y_status"),
        Y_OUTPUT => Some("Y_output"),
        A_DATA => Some("A_data"),
        B_DATA => Some("B_data"),
        _ => None,
    }
}

/// Decode a status-register value into the device's full/empty convention.
///
/// `A_status` and `B_status` read 0 when full; `Y_status` reads 1 when the
/// result is pending. Non-status addresses decode to None.
pub fn decode_status(address: u64, value: u64) -> Option<&'static str> {
    match address {
        A_STATUS | B_STATUS => Some(if value == 0 { "full" } else { "empty" }),
        Y_STATUS => Some(if value == 1 { "full" } else { "empty" }),
        _ => None,
    }
}
