diesel::table! {
    counter (version) {
        version -> Int4,
        total_count -> Int8,
    }
}
