//! Esquema Diesel (declarado manualmente). Reemplazable con `diesel print-schema`.

diesel::table! {
    flagged_instances (instance_id) {
        instance_id -> Text,
        first_seen -> Timestamp,
        last_seen -> Timestamp,
        missing_tags -> Text,
        is_active -> Bool,
    }
}
