//! Ledger and pool domain types.
//!
//! Everything here is storage-agnostic: plain data, state machines, and the
//! pure payout arithmetic. Persistence lives in
//! [`adapter::outbound::sqlite`](crate::adapter::outbound::sqlite).

/// Declare a fieldless enum persisted as a lowercase text column.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Stored text form.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        concat!("unknown ", stringify!($name), " '{}'"),
                        other
                    )),
                }
            }
        }
    };
}

pub mod error;
pub mod id;
pub mod job;
pub mod money;
pub mod payout;
pub mod policy;
pub mod pool;
pub mod wallet;

pub use error::DomainError;
pub use id::{EntryId, JobId, OptionId, PoolId, Reference, UserId, WalletId};
pub use money::Amount;
pub use policy::LedgerPolicy;
