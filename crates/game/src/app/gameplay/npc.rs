/// Every NPC that can start an encounter. The set is closed: grading,
/// starter snippets and dialogue all match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NpcIdentity {
    OldManCedric,
    BugsyTheApprentice,
    TorchbearerKorr,
}

/// Authoring data for one NPC. Immutable for the process lifetime.
#[derive(Debug)]
pub(crate) struct NpcProfile {
    pub(crate) name: &'static str,
    pub(crate) tile: (i32, i32),
    pub(crate) dialogue: &'static [&'static str],
    pub(crate) prompt: &'static [&'static str],
    pub(crate) starter: &'static [&'static str],
    pub(crate) failure_message: &'static str,
}

/// Encounter order: the first NPC whose tile matches wins.
pub(crate) const ROSTER: [NpcIdentity; 3] = [
    NpcIdentity::OldManCedric,
    NpcIdentity::BugsyTheApprentice,
    NpcIdentity::TorchbearerKorr,
];

static OLD_MAN_CEDRIC: NpcProfile = NpcProfile {
    name: "Old Man Cedric",
    tile: (42, 4),
    dialogue: &[
        "Old Man Cedric: Ah, a fresh traveler at last.",
        "Old Man Cedric: The gates of Codemire test all who enter.",
        "Old Man Cedric: To pass, you must prove your mind is not easily scrambled.",
        "Old Man Cedric: I present to you... the Rune of Reversal.",
    ],
    prompt: &[
        "The Rune of Reversal",
        "An ancient word lies before you, written backwards by time.",
        "Your task: Return the correct form of the word by reversing it.",
        "Example:",
        "  rune = 'elgnis' => 'single'",
    ],
    starter: &["rune = 'elgnis'"],
    failure_message: "Try again. Make sure 'rune' is correct.",
};

static BUGSY_THE_APPRENTICE: NpcProfile = NpcProfile {
    name: "Bugsy the Apprentice",
    tile: (53, 19),
    dialogue: &[
        "Bugsy: Oh no, not again...",
        "Bugsy: My loop won't include 10. It's cursed!",
        "Bugsy: Can you take a look?",
    ],
    prompt: &[
        "Loop of Frustration",
        "Bugsy's code:",
        "  for i in range(1, 10):",
        "      print(i)",
        "He wants it to print numbers from 1 to 10 **including** 10.",
        "Your task: Fix the code so it includes 10.",
    ],
    starter: &["for i in range(1, 10):", "    print(i)"],
    failure_message: "That doesn't include 10.",
};

static TORCHBEARER_KORR: NpcProfile = NpcProfile {
    name: "Torchbearer Korr",
    tile: (49, 35),
    dialogue: &[
        "Torchbearer Korr: Halt.",
        "Torchbearer Korr: Beyond here lies the Forest of Broken Functions.",
        "Torchbearer Korr: Solve this, and I'll let you pass.",
    ],
    prompt: &[
        "The Broken Function",
        "A traveler left this behind before disappearing into the forest:",
        "  def add(a, b):",
        "      return a - b",
        "But they meant for it to **add** the two numbers.",
        "Your task: Fix the function so it returns the correct sum.",
    ],
    starter: &["def add(a, b):", "    return a - b"],
    failure_message: "Check your 'add' function.",
};

impl NpcIdentity {
    pub(crate) fn profile(self) -> &'static NpcProfile {
        match self {
            NpcIdentity::OldManCedric => &OLD_MAN_CEDRIC,
            NpcIdentity::BugsyTheApprentice => &BUGSY_THE_APPRENTICE,
            NpcIdentity::TorchbearerKorr => &TORCHBEARER_KORR,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        self.profile().name
    }

    pub(crate) fn tile(self) -> (i32, i32) {
        self.profile().tile
    }

    pub(crate) fn dialogue(self) -> &'static [&'static str] {
        self.profile().dialogue
    }

    pub(crate) fn starter(self) -> &'static [&'static str] {
        self.profile().starter
    }
}
