// Diesel table definitions, kept in sync with repository::migrations.
//
// Ids and timestamps are stored as text (UUID / RFC 3339), money as integer
// cents (BigInt), booleans as 0/1 integers.

diesel::table! {
    users (id) {
        id -> Text,
        email -> Text,
        full_name -> Text,
        is_active -> Integer,
        created_at -> Text,
    }
}

diesel::table! {
    trips (id) {
        id -> Text,
        user_id -> Text,
        origin -> Text,
        destination -> Text,
        departure_date -> Text,
        return_date -> Nullable<Text>,
        travelers -> Integer,
        trip_type -> Text,
        notes -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    price_watches (id) {
        id -> Text,
        user_id -> Text,
        trip_id -> Text,
        provider -> Text,
        target_price -> BigInt,
        currency -> Text,
        is_active -> Integer,
        cooldown_hours -> Integer,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    price_snapshots (id) {
        id -> Text,
        trip_id -> Text,
        user_id -> Text,
        provider -> Text,
        price -> BigInt,
        currency -> Text,
        cabin_class -> Nullable<Text>,
        airline -> Nullable<Text>,
        outbound_departure -> Nullable<Text>,
        outbound_arrival -> Nullable<Text>,
        return_departure -> Nullable<Text>,
        return_arrival -> Nullable<Text>,
        stops -> Nullable<Integer>,
        raw_data -> Nullable<Text>,
        scraped_at -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    alerts (id) {
        id -> Text,
        watch_id -> Text,
        user_id -> Text,
        snapshot_id -> Text,
        alert_type -> Text,
        channel -> Text,
        status -> Text,
        target_price -> BigInt,
        triggered_price -> BigInt,
        message -> Nullable<Text>,
        sent_at -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::joinable!(trips -> users (user_id));
diesel::joinable!(price_watches -> trips (trip_id));
diesel::joinable!(price_snapshots -> trips (trip_id));
diesel::joinable!(alerts -> price_watches (watch_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    trips,
    price_watches,
    price_snapshots,
    alerts,
);
