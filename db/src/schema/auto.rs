table! {
    lexicon (strongs_id) {
        strongs_id -> Text,
        headword -> Text,
        transliteration -> Text,
        gloss -> Text,
    }
}

table! {
    verses (id) {
        id -> Integer,
        book_code -> Text,
        book_name -> Text,
        chapter -> Integer,
        verse -> Integer,
        text -> Text,
        translation_source -> Text,
    }
}

table! {
    words (id) {
        id -> Integer,
        verse_id -> Integer,
        word_position -> Integer,
        surface_form -> Text,
        strongs_id -> Nullable<Text>,
        grammar_code -> Nullable<Text>,
        morphology_code -> Nullable<Text>,
        transliteration -> Nullable<Text>,
        gloss -> Nullable<Text>,
        cross_language_word -> Nullable<Text>,
        cross_language_position -> Nullable<Text>,
    }
}

joinable!(words -> verses (verse_id));

allow_tables_to_appear_in_same_query!(
    lexicon,
    verses,
    words,
);
