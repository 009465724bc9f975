use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Permission identifier not in the catalogue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

macro_rules! permissions {
    ($($(#[$meta:meta])* $variant:ident => $name:literal,)+) => {
        /// Fine-grained capability token (`resource:action`).
        ///
        /// [`Permission::All`] (`"*"`) is the wildcard: a role holding it is
        /// granted every permission.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Permission {
            $($(#[$meta])* $variant,)+
        }

        impl Permission {
            /// Every permission, wildcard included.
            pub const ALL: &'static [Permission] = &[$(Permission::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Permission::$variant => $name,)+
                }
            }
        }

        impl FromStr for Permission {
            type Err = UnknownPermission;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Permission::$variant),)+
                    _ => Err(UnknownPermission(s.to_string())),
                }
            }
        }
    };
}

permissions! {
    /// Wildcard.
    All => "*",
    ProductsRead => "products:read",
    ProductsCreate => "products:create",
    ProductsUpdate => "products:update",
    ProductsDelete => "products:delete",
    CategoriesManage => "categories:manage",
    InventoryManage => "inventory:manage",
    CartManage => "cart:manage",
    OrdersReadOwn => "orders:read_own",
    OrdersCreate => "orders:create",
    OrdersCancelOwn => "orders:cancel_own",
    OrdersReadAll => "orders:read_all",
    OrdersUpdateStatus => "orders:update_status",
    OrdersManageAll => "orders:manage_all",
    ReviewsCreate => "reviews:create",
    ReviewsModerate => "reviews:moderate",
    ProfileReadOwn => "profile:read_own",
    ProfileUpdateOwn => "profile:update_own",
    UsersRead => "users:read",
    UsersManage => "users:manage",
    AnalyticsRead => "analytics:read",
    SettingsManage => "settings:manage",
}

impl Permission {
    pub fn is_wildcard(&self) -> bool {
        *self == Permission::All
    }

    /// Resource part of the token (`"orders"` for `orders:read_own`).
    pub fn resource(&self) -> &'static str {
        self.as_str().split(':').next().unwrap_or("*")
    }

    /// Action part of the token (`"read_own"` for `orders:read_own`).
    pub fn action(&self) -> &'static str {
        self.as_str().split_once(':').map(|(_, a)| a).unwrap_or("*")
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
