pub const MAX_ROOMS: usize = 10_000;
pub const MAX_GUESTS: usize = 1_000_000;
pub const MAX_RESERVATIONS: usize = 1_000_000;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_DOCUMENT_LEN: usize = 64;

/// Upper bound for `Room::capacity` and `Reservation::amount_of_guests`.
pub const MAX_OCCUPANCY: u32 = 1_000;
