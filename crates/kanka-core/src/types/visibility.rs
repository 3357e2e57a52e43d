//! Small wire enumerations.

/// Who can see a post or asset.
///
/// `Inherit` leaves the field out of the payload, so the campaign's default
/// visibility applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Everyone who can see the entity.
    All,
    /// Campaign admins.
    Admin,
    /// Admins and the author.
    AdminSelf,
    /// Only the author.
    SelfOnly,
    /// Campaign members.
    Members,
    /// The campaign default.
    #[default]
    Inherit,
}

impl Visibility {
    /// The `visibility_id` wire value, `None` for [`Visibility::Inherit`].
    pub fn id(self) -> Option<i64> {
        match self {
            Visibility::All => Some(1),
            Visibility::Admin => Some(2),
            Visibility::AdminSelf => Some(3),
            Visibility::SelfOnly => Some(4),
            Visibility::Members => Some(5),
            Visibility::Inherit => None,
        }
    }

    /// Maps a `visibility_id` back to a variant.
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Visibility::All),
            2 => Some(Visibility::Admin),
            3 => Some(Visibility::AdminSelf),
            4 => Some(Visibility::SelfOnly),
            5 => Some(Visibility::Members),
            _ => None,
        }
    }
}

/// The three asset variants, by `type_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// An uploaded file.
    File,
    /// An external link with an optional icon.
    Link,
    /// An alternate name for the entity.
    Alias,
}

impl AssetKind {
    /// The `type_id` wire value.
    pub fn type_id(self) -> i64 {
        match self {
            AssetKind::File => 1,
            AssetKind::Link => 2,
            AssetKind::Alias => 3,
        }
    }

    /// Maps a `type_id` back to a variant.
    pub fn from_type_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(AssetKind::File),
            2 => Some(AssetKind::Link),
            3 => Some(AssetKind::Alias),
            _ => None,
        }
    }
}

/// The two image slots of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageSlot {
    /// The main image.
    #[default]
    Main,
    /// The header image.
    Header,
}

impl ImageSlot {
    pub(crate) fn is_header(self) -> bool {
        self == ImageSlot::Header
    }
}
