//! Data models for Lectern

/// Implements string conversions and the Postgres TEXT codec for a closed status enum.
///
/// Statuses are stored as lowercase text so the schema stays readable from psql.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($ty), s)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                let s: String = self.as_str().to_string();
                <String as sqlx::Encode<sqlx::Postgres>>::encode(s, buf)
            }
        }
    };
}

pub mod book;
pub mod borrowing;
pub mod fine;
pub mod fine_level;
pub mod return_request;
pub mod stats;
pub mod user;

// Re-export commonly used types
pub use book::{Book, Inventory};
pub use borrowing::{BookCondition, Borrowing, BorrowingState, BorrowingStatus, BorrowingView};
pub use fine::{Fine, FineReason, FineStatus};
pub use fine_level::FineLevel;
pub use return_request::{ReturnRequest, ReturnRequestStatus};
pub use user::{Actor, Role, UserClaims};
