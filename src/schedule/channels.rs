use std::collections::HashMap;

/// Player channel identifiers mapped to the schedule service's ids.
const BUILTIN_CHANNELS: &[(&str, &str)] = &[
    ("uuid-webtv-612", "536"),  // TF1
    ("uuid-webtv-201", "270"),  // France 2
    ("uuid-webtv-202", "363"),  // France 3
    ("uuid-webtv-376", "412"),  // France 4
    ("uuid-webtv-203", "272"),  // France 5
    ("uuid-webtv-613", "537"),  // M6
    ("uuid-webtv-204", "273"),  // Arte
    ("uuid-webtv-226", "294"),  // LCP
    ("uuid-webtv-373", "409"),  // W9
    ("uuid-webtv-497", "517"),  // TMC
    ("uuid-webtv-374", "410"),  // TFX
    ("uuid-webtv-677", "557"),  // Gulli
    ("uuid-webtv-400", "429"),  // BFMTV
    ("uuid-webtv-679", "559"),  // CNEWS
    ("uuid-webtv-1145", "107"), // LCI
    ("uuid-webtv-1173", "124"), // franceinfo
    ("uuid-webtv-678", "558"),  // CSTAR
    ("uuid-webtv-995", "845"),  // 6ter
    ("uuid-webtv-998", "848"),  // RMC Life
];

#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    entries: HashMap<String, String>,
}

impl ChannelMap {
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_CHANNELS.iter().copied())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut map = Self::builtin();
        map.entries
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        map
    }

    /// A miss means the channel is simply not tracked.
    pub fn external_id(&self, channel_id: &str) -> Option<&str> {
        self.entries.get(channel_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
