//! core/tags/frames.rs
//! Schema field name -> ID3 frame.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Frame {
    /// Plain T*** text frame; multiple values are NUL-separated (ID3v2.4).
    Text(&'static str),
    /// Text frame holding a single integer (TBPM).
    Integer(&'static str),
    /// The `n` of an `n/total` frame (TRCK, TPOS).
    Number(&'static str),
    /// The `total` of an `n/total` frame.
    Total(&'static str),
    /// First COMM frame.
    Comment,
    /// Not a frame: probed from the audio stream.
    Duration,
}

pub(crate) fn frame_for(name: &str) -> Option<Frame> {
    let frame = match name {
        "title" => Frame::Text("TIT2"),
        "artist" => Frame::Text("TPE1"),
        "album" => Frame::Text("TALB"),
        "album_artist" => Frame::Text("TPE2"),
        "composer" => Frame::Text("TCOM"),
        "genre" => Frame::Text("TCON"),
        "track_no" => Frame::Number("TRCK"),
        "track_total" => Frame::Total("TRCK"),
        "disc_no" => Frame::Number("TPOS"),
        "disc_total" => Frame::Total("TPOS"),
        "date" => Frame::Text("TDRC"),
        "bpm" => Frame::Integer("TBPM"),
        "grouping" => Frame::Text("TIT1"),
        "lyricist" => Frame::Text("TEXT"),
        "conductor" => Frame::Text("TPE3"),
        "remixer" => Frame::Text("TPE4"),
        "publisher" => Frame::Text("TPUB"),
        "subtitle" => Frame::Text("TIT3"),
        "initial_key" => Frame::Text("TKEY"),
        "mood" => Frame::Text("TMOO"),
        "language" => Frame::Text("TLAN"),
        "isrc" => Frame::Text("TSRC"),
        "encoded_by" => Frame::Text("TENC"),
        "copyright" => Frame::Text("TCOP"),
        "comment" => Frame::Comment,
        "duration" => Frame::Duration,
        _ => return None,
    };
    Some(frame)
}
