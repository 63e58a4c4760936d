//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use dispatch_core::attribution;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( x if x == $val => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Attribution lifecycle status.
    AttributionStatus {
        Broadcasting = attribution::STATUS_BROADCASTING,
        Accepted = attribution::STATUS_ACCEPTED,
        Completed = attribution::STATUS_COMPLETED,
        Expired = attribution::STATUS_EXPIRED,
        Cancelled = attribution::STATUS_CANCELLED,
    }
}

impl AttributionStatus {
    /// Lower-case name as stored in `attribution_statuses.name`.
    pub fn name(self) -> &'static str {
        attribution::state_machine::status_name(self.id())
    }

    /// Statuses in which a booking's generation is still live.
    pub const NON_TERMINAL: [AttributionStatus; 2] = [Self::Broadcasting, Self::Accepted];
}
