#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpcRecord {
    pub name: &'static str,
    pub lookup_path: &'static str,
}

/// One unlock flag and the NPCs it gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoulGroup {
    pub flag: &'static str,
    pub item_name: &'static str,
    pub members: &'static [&'static str],
}

/// Immutable name -> path table plus the flag -> NPC group table.
#[derive(Debug, Clone, Copy)]
pub struct NpcRegistry {
    records: &'static [NpcRecord],
    groups: &'static [SoulGroup],
}

const GOOSE_VILLAGE_NPCS: [NpcRecord; 12] = [
    npc("Groundskeeper", "boilerRoom/ObjectManager/GeneratedGroups/people/gardener brain"),
    npc("Boy", "boilerRoom/ObjectManager/GeneratedGroups/people/wimp brain"),
    npc("TVShopOwner", "boilerRoom/ObjectManager/GeneratedGroups/people/tvshop brain"),
    npc("MarketLady", "boilerRoom/ObjectManager/GeneratedGroups/people/shopkeeper brain"),
    npc("TidyNeighbour", "boilerRoom/ObjectManager/GeneratedGroups/people/neighbourClean brain"),
    npc(
        "MessyNeighbour",
        "boilerRoom/ObjectManager/GeneratedGroups/people/neighbourMessyFixed brain",
    ),
    npc("BurlyMan", "boilerRoom/ObjectManager/GeneratedGroups/people/pub man brain"),
    npc("OldMan", "boilerRoom/ObjectManager/GeneratedGroups/people/oldMan brain"),
    npc("PubLady", "boilerRoom/ObjectManager/GeneratedGroups/people/pub woman brain"),
    npc("FancyLadies1", "boilerRoom/ObjectManager/GeneratedGroups/people/gossip1 brain"),
    npc("FancyLadies2", "boilerRoom/ObjectManager/GeneratedGroups/people/gossip2 brain"),
    npc("Cook", "boilerRoom/ObjectManager/GeneratedGroups/people/cook brain"),
];

const GOOSE_VILLAGE_SOULS: [SoulGroup; 11] = [
    soul("Groundskeeper", "Groundskeeper Soul", &["Groundskeeper"]),
    soul("Boy", "Boy Soul", &["Boy"]),
    soul("TVShopOwner", "TV Shop Owner Soul", &["TVShopOwner"]),
    soul("MarketLady", "Market Lady Soul", &["MarketLady"]),
    soul("TidyNeighbour", "Tidy Neighbour Soul", &["TidyNeighbour"]),
    soul("MessyNeighbour", "Messy Neighbour Soul", &["MessyNeighbour"]),
    soul("BurlyMan", "Burly Man Soul", &["BurlyMan"]),
    soul("OldMan", "Old Man Soul", &["OldMan"]),
    soul("PubLady", "Pub Lady Soul", &["PubLady"]),
    soul(
        "FancyLadies",
        "Fancy Ladies Soul",
        &["FancyLadies1", "FancyLadies2"],
    ),
    soul("Cook", "Cook Soul", &["Cook"]),
];

pub static GOOSE_VILLAGE: NpcRegistry =
    NpcRegistry::new(&GOOSE_VILLAGE_NPCS, &GOOSE_VILLAGE_SOULS);

const fn npc(name: &'static str, lookup_path: &'static str) -> NpcRecord {
    NpcRecord { name, lookup_path }
}

const fn soul(
    flag: &'static str,
    item_name: &'static str,
    members: &'static [&'static str],
) -> SoulGroup {
    SoulGroup {
        flag,
        item_name,
        members,
    }
}

impl NpcRegistry {
    pub const fn new(records: &'static [NpcRecord], groups: &'static [SoulGroup]) -> Self {
        Self { records, groups }
    }

    pub fn records(&self) -> &'static [NpcRecord] {
        self.records
    }

    pub fn groups(&self) -> &'static [SoulGroup] {
        self.groups
    }

    pub fn record(&self, name: &str) -> Option<&'static NpcRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    pub fn lookup_path(&self, name: &str) -> Option<&'static str> {
        self.record(name).map(|record| record.lookup_path)
    }

    pub fn group(&self, flag: &str) -> Option<&'static SoulGroup> {
        self.groups.iter().find(|group| group.flag == flag)
    }

    pub fn group_for_item(&self, item_name: &str) -> Option<&'static SoulGroup> {
        self.groups.iter().find(|group| group.item_name == item_name)
    }

    /// Resolves an activation name to concrete NPC names. A flag name expands to its group's
    /// members; anything else stands for itself.
    pub fn expand<'a>(&self, name: &'a str) -> Vec<&'a str> {
        match self.group(name) {
            Some(group) => group.members.to_vec(),
            None => vec![name],
        }
    }
}
