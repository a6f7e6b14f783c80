diesel::table! {
    users (id) {
        id -> Int4,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    datasets (id) {
        id -> Int4,
        owner_id -> Int4,
        name -> Text,
        description -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    data_files (id) {
        id -> Int4,
        dataset_id -> Int4,
        filename -> Text,
        signature -> Text,
        storage_path -> Text,
        size_bytes -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    starred_datasets (id) {
        id -> Int4,
        user_id -> Int4,
        dataset_id -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(datasets -> users (owner_id));
diesel::joinable!(data_files -> datasets (dataset_id));
diesel::joinable!(starred_datasets -> datasets (dataset_id));
diesel::joinable!(starred_datasets -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, datasets, data_files, starred_datasets,);
