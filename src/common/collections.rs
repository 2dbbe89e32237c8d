//! Hash collections keyed with `rustc-hash`; window and node ids hash cheaply
//! and never come from untrusted input.

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
