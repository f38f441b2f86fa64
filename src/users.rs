/// Fixed id -> display name table. Ids 18-20 are reserved and unassigned.
const USER_NAMES: &[(i64, &str)] = &[
    (1, "నాసిన. అంకయ్య"),
    (2, "నాసిన. వాసు"),
    (3, "నాసిన. సంపూర్ణమ్మ"),
    (4, "గెద్దే. కొండయ్య"),
    (5, "కుట్టుబోయిన. వరలక్ష్మమ్మ"),
    (6, "వెలినేని. సుగుణమ్మ"),
    (7, "వడ్లమాని. రాఘవులు నాయుడు"),
    (8, "వెలినేని. రవణమ్మ"),
    (9, "వడ్లమాని. అల్లిబాబు"),
    (10, "వడ్లమాని. అనిల్"),
    (11, "వడ్లమాని. దొరసానమ్మ"),
    (12, "కాకుటూరి. నాగేశ్వరరావు"),
    (13, "చిట్టిబోయిన. వేంకటేశ్వర్లు"),
    (14, "చిట్టిబోయిన. మమత"),
    (15, "గిద్దలూరి. ప్రకాష్"),
    (16, "కూనిశెట్టి. కళాధరరావు"),
    (17, "వడ్లమాని. బుజ్జయ్య"),
    (18, UNASSIGNED),
    (19, UNASSIGNED),
    (20, UNASSIGNED),
];

pub const UNASSIGNED: &str = "N/A";

pub const MIN_USER_ID: i64 = 1;
pub const MAX_USER_ID: i64 = 20;

pub fn display_name(id: i64) -> Option<&'static str> {
    USER_NAMES
        .iter()
        .find(|(uid, _)| *uid == id)
        .map(|(_, name)| *name)
}

/// All users in ascending id order.
pub fn all() -> impl Iterator<Item = (i64, &'static str)> {
    USER_NAMES.iter().copied()
}
