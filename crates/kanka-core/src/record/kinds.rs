//! Schema tables for every record type the client knows.

use std::fmt;

use super::field::{Field, FieldDefault, FieldType};
use super::schema::Schema;

use FieldType::{Bool, DateTime, Int, IntList, Json, Records, Str, StrList};

const CREATED_UPDATED: &[Field] = &[
    Field::optional("created_at", DateTime).read_only(),
    Field::optional("created_by", Int).read_only(),
    Field::optional("updated_at", DateTime).read_only(),
    Field::optional("updated_by", Int).read_only(),
];

/// Fields shared by the twelve entity types.
const ENTITY_BASE: &[Field] = &[
    Field::required("id", Int).read_only(),
    Field::optional("entity_id", Int).read_only(),
    Field::required("name", Str),
    Field::optional("entry", Str),
    Field::optional("type", Str),
    Field::optional("image", Str),
    Field::optional("image_full", Str),
    Field::optional("image_thumb", Str),
    Field::optional("is_private", Bool).default_to(FieldDefault::False),
    Field::optional("tags", IntList).default_to(FieldDefault::EmptyList),
];

/// Embedded sub-resources, present with `related=1`.
static RELATED: [Field; 2] = [
    Field::optional("posts", Records(&POST)),
    Field::optional("attributes", Json),
];

const CALENDAR_FIELDS: &[Field] = &[
    Field::optional("date", Str),
    Field::optional("parameters", Str),
    Field::optional("months", Json),
    Field::optional("weekdays", StrList),
    Field::optional("years", Json),
    Field::optional("seasons", Json),
    Field::optional("moons", Json),
    Field::optional("suffix", Str),
    Field::optional("has_leap_year", Bool),
    Field::optional("leap_year_amount", Int),
    Field::optional("leap_year_month", Int),
    Field::optional("leap_year_offset", Int),
    Field::optional("leap_year_start", Int),
];

const CHARACTER_FIELDS: &[Field] = &[
    Field::optional("location_id", Int),
    Field::optional("title", Str),
    Field::optional("age", Str),
    Field::optional("sex", Str),
    Field::optional("race_id", Int),
    Field::optional("family_id", Int),
    Field::optional("is_dead", Bool).default_to(FieldDefault::False),
    Field::optional("traits", Str),
];

const CREATURE_FIELDS: &[Field] = &[Field::optional("location_id", Int)];

const EVENT_FIELDS: &[Field] = &[
    Field::optional("date", Str),
    Field::optional("location_id", Int),
];

const FAMILY_FIELDS: &[Field] = &[
    Field::optional("location_id", Int),
    Field::optional("family_id", Int),
];

const JOURNAL_FIELDS: &[Field] = &[
    Field::optional("date", Str),
    Field::optional("character_id", Int),
];

const LOCATION_FIELDS: &[Field] = &[
    Field::optional("map", Str),
    Field::optional("map_url", Str),
    Field::optional("is_map_private", Int),
    Field::optional("parent_location_id", Int),
];

const NOTE_FIELDS: &[Field] = &[];

const ORGANISATION_FIELDS: &[Field] = &[
    Field::optional("location_id", Int),
    Field::optional("organisation_id", Int),
];

const QUEST_FIELDS: &[Field] = &[
    Field::optional("quest_id", Int),
    Field::optional("character_id", Int),
];

const RACE_FIELDS: &[Field] = &[Field::optional("race_id", Int)];

const TAG_FIELDS: &[Field] = &[
    // One of the API's named colours; not validated client side.
    Field::optional("colour", Str),
    Field::optional("tag_id", Int),
];

macro_rules! entity_schema {
    ($static_name:ident, $name:literal, $fields:ident) => {
        #[doc = concat!("The `", $name, "` entity type.")]
        pub static $static_name: Schema = Schema {
            name: $name,
            groups: &[ENTITY_BASE, $fields, &RELATED, CREATED_UPDATED],
            universal_id: Some("entity_id"),
            always_send: &[],
        };
    };
}

entity_schema!(CALENDAR, "Calendar", CALENDAR_FIELDS);
entity_schema!(CHARACTER, "Character", CHARACTER_FIELDS);
entity_schema!(CREATURE, "Creature", CREATURE_FIELDS);
entity_schema!(EVENT, "Event", EVENT_FIELDS);
entity_schema!(FAMILY, "Family", FAMILY_FIELDS);
entity_schema!(JOURNAL, "Journal", JOURNAL_FIELDS);
entity_schema!(LOCATION, "Location", LOCATION_FIELDS);
entity_schema!(NOTE, "Note", NOTE_FIELDS);
entity_schema!(ORGANISATION, "Organisation", ORGANISATION_FIELDS);
entity_schema!(QUEST, "Quest", QUEST_FIELDS);
entity_schema!(RACE, "Race", RACE_FIELDS);
entity_schema!(TAG, "Tag", TAG_FIELDS);

const POST_FIELDS: &[Field] = &[
    Field::required("id", Int).read_only(),
    Field::optional("entity_id", Int).read_only(),
    Field::required("name", Str),
    Field::optional("entry", Str),
    Field::optional("visibility_id", Int),
    Field::optional("is_private", Bool).default_to(FieldDefault::False),
    Field::optional("position", Int),
];

/// A post attached to an entity. `entity_id` is the owner's universal id.
pub static POST: Schema = Schema {
    name: "Post",
    groups: &[POST_FIELDS, CREATED_UPDATED],
    universal_id: None,
    // The API rejects post updates that omit the title.
    always_send: &["name"],
};

const ASSET_FIELDS: &[Field] = &[
    Field::required("id", Int).read_only(),
    Field::optional("entity_id", Int).read_only(),
    Field::required("name", Str),
    Field::optional("type_id", Int),
    Field::optional("visibility_id", Int),
    Field::optional("is_pinned", Bool).default_to(FieldDefault::False),
    Field::optional("is_private", Bool).default_to(FieldDefault::False),
    Field::optional("metadata", Json),
    Field::optional("url", Str).wire("_url"),
];

/// A file, link or alias asset of an entity.
pub static ASSET: Schema = Schema {
    name: "Asset",
    groups: &[ASSET_FIELDS, CREATED_UPDATED],
    universal_id: None,
    always_send: &[],
};

const ENTITY_IMAGE_FIELDS: &[Field] = &[
    Field::optional("image", Json),
    Field::optional("header", Json),
];

/// The main and header image slots of an entity.
pub static ENTITY_IMAGE: Schema = Schema {
    name: "EntityImage",
    groups: &[ENTITY_IMAGE_FIELDS],
    universal_id: None,
    always_send: &[],
};

const GALLERY_IMAGE_FIELDS: &[Field] = &[
    Field::required("id", Str).read_only(),
    Field::optional("name", Str),
    Field::optional("ext", Str),
    Field::optional("size", Int),
    Field::optional("path", Str),
    Field::optional("folder_id", Str),
    Field::optional("is_folder", Bool).default_to(FieldDefault::False),
    Field::optional("visibility_id", Int),
];

/// An image in the campaign gallery, keyed by uuid.
pub static GALLERY_IMAGE: Schema = Schema {
    name: "GalleryImage",
    groups: &[GALLERY_IMAGE_FIELDS, CREATED_UPDATED],
    universal_id: None,
    always_send: &[],
};

const SEARCH_RESULT_FIELDS: &[Field] = &[
    Field::required("id", Int),
    Field::optional("entity_id", Int),
    Field::required("name", Str),
    Field::optional("type", Str),
    Field::optional("url", Str),
    Field::optional("image", Str),
    Field::optional("tooltip", Str),
    Field::optional("is_private", Bool).default_to(FieldDefault::False),
    Field::optional("tags", IntList).default_to(FieldDefault::EmptyList),
    Field::optional("created_at", DateTime),
    Field::optional("updated_at", DateTime),
];

/// One hit of a campaign search.
pub static SEARCH_RESULT: Schema = Schema {
    name: "SearchResult",
    groups: &[SEARCH_RESULT_FIELDS],
    universal_id: Some("entity_id"),
    always_send: &[],
};

const ENTITY_FIELDS: &[Field] = &[
    Field::required("id", Int).read_only(),
    Field::optional("name", Str),
    Field::optional("type", Str),
    Field::optional("child_id", Int),
    Field::optional("tags", IntList).default_to(FieldDefault::EmptyList),
    Field::optional("is_private", Bool).default_to(FieldDefault::False),
];

/// A type-agnostic entity from the `entities` endpoint. Its `id` is the
/// universal id; `child_id` is the type-scoped one.
pub static ENTITY: Schema = Schema {
    name: "Entity",
    groups: &[ENTITY_FIELDS, CREATED_UPDATED],
    universal_id: Some("id"),
    always_send: &[],
};

/// The twelve entity types and their endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Calendar,
    Character,
    Creature,
    Event,
    Family,
    Journal,
    Location,
    Note,
    Organisation,
    Quest,
    Race,
    Tag,
}

impl RecordKind {
    /// Every kind, in endpoint order.
    pub const ALL: [RecordKind; 12] = [
        RecordKind::Calendar,
        RecordKind::Character,
        RecordKind::Creature,
        RecordKind::Event,
        RecordKind::Family,
        RecordKind::Journal,
        RecordKind::Location,
        RecordKind::Note,
        RecordKind::Organisation,
        RecordKind::Quest,
        RecordKind::Race,
        RecordKind::Tag,
    ];

    /// The campaign-relative collection path, e.g. `characters`.
    pub fn endpoint(self) -> &'static str {
        match self {
            RecordKind::Calendar => "calendars",
            RecordKind::Character => "characters",
            RecordKind::Creature => "creatures",
            RecordKind::Event => "events",
            RecordKind::Family => "families",
            RecordKind::Journal => "journals",
            RecordKind::Location => "locations",
            RecordKind::Note => "notes",
            RecordKind::Organisation => "organisations",
            RecordKind::Quest => "quests",
            RecordKind::Race => "races",
            RecordKind::Tag => "tags",
        }
    }

    /// The schema records of this kind are parsed with.
    pub fn schema(self) -> &'static Schema {
        match self {
            RecordKind::Calendar => &CALENDAR,
            RecordKind::Character => &CHARACTER,
            RecordKind::Creature => &CREATURE,
            RecordKind::Event => &EVENT,
            RecordKind::Family => &FAMILY,
            RecordKind::Journal => &JOURNAL,
            RecordKind::Location => &LOCATION,
            RecordKind::Note => &NOTE,
            RecordKind::Organisation => &ORGANISATION,
            RecordKind::Quest => &QUEST,
            RecordKind::Race => &RACE,
            RecordKind::Tag => &TAG,
        }
    }

    /// The singular type tag used by the `types` filter, e.g. `character`.
    pub fn type_tag(self) -> String {
        self.schema().type_tag()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_payload_parses_for_every_kind() {
        for kind in RecordKind::ALL {
            let record = kind
                .schema()
                .parse(&json!({"id": 1, "entity_id": 10, "name": "X"}))
                .unwrap();
            assert_eq!(record.entity_id(), Some(10));
            assert_eq!(record.get_bool("is_private"), Some(false));
            assert_eq!(record.get_int_list("tags"), Some(&[][..]));
        }
    }

    #[test]
    fn endpoints_and_tags() {
        assert_eq!(RecordKind::Family.endpoint(), "families");
        assert_eq!(RecordKind::Family.type_tag(), "family");
        assert_eq!(RecordKind::Organisation.to_string(), "organisations");
    }

    #[test]
    fn asset_url_uses_wire_alias() {
        let asset = ASSET
            .parse(&json!({"id": 3, "name": "map", "type_id": 1, "_url": "https://cdn/a.png"}))
            .unwrap();
        assert_eq!(asset.get_str("url"), Some("https://cdn/a.png"));
        assert_eq!(asset.to_wire(None).get("_url"), Some(&json!("https://cdn/a.png")));
    }

    #[test]
    fn generic_entity_universal_id_is_id() {
        let entity = ENTITY
            .parse(&json!({"id": 100, "name": "Aria", "type": "character", "child_id": 1}))
            .unwrap();
        assert_eq!(entity.entity_id(), Some(100));
        assert_eq!(entity.get_i64("child_id"), Some(1));
    }

    #[test]
    fn gallery_image_id_is_a_uuid_string() {
        let image = GALLERY_IMAGE
            .parse(&json!({"id": "9b2f6c1e-0000-4000-8000-000000000001", "name": "x"}))
            .unwrap();
        assert_eq!(image.get_str("id"), Some("9b2f6c1e-0000-4000-8000-000000000001"));
        assert_eq!(image.id(), None);
    }
}
