//! Relation types and their inverse tables.
//!
//! Both relation layers are closed enums. External strings are converted once,
//! at the format boundary, through [`FromStr`]; everything past that point works
//! on the enum. The inverse of each type is an exhaustive `match`, so adding a
//! variant without deciding its inverse fails to compile.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Behaviour shared by both relation layers, used by the relation engine.
pub trait RelationType: Copy + Eq + Hash + fmt::Debug + fmt::Display {
    /// The type that must appear on the target pointing back, if any.
    fn inverse(self) -> Option<Self>;

    /// WN-LMF spelling of the type.
    fn as_str(self) -> &'static str;

    /// Whether the YAML corpus omits this half of an inverse pair and
    /// regenerates it on load.
    fn is_derived(self) -> bool;
}

macro_rules! relation_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(ModelError::UnknownValue {
                        what: $what,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

relation_enum! {
    /// Relation types between synsets.
    SynsetRelType, "synset relation type" {
        Agent => "agent",
        Also => "also",
        Antonym => "antonym",
        Attribute => "attribute",
        BeInState => "be_in_state",
        Causes => "causes",
        ClassifiedBy => "classified_by",
        Classifies => "classifies",
        CoAgentInstrument => "co_agent_instrument",
        CoAgentPatient => "co_agent_patient",
        CoAgentResult => "co_agent_result",
        CoInstrumentAgent => "co_instrument_agent",
        CoInstrumentPatient => "co_instrument_patient",
        CoInstrumentResult => "co_instrument_result",
        CoPatientAgent => "co_patient_agent",
        CoPatientInstrument => "co_patient_instrument",
        CoResultAgent => "co_result_agent",
        CoResultInstrument => "co_result_instrument",
        CoRole => "co_role",
        Direction => "direction",
        DomainRegion => "domain_region",
        DomainTopic => "domain_topic",
        Entails => "entails",
        EqSynonym => "eq_synonym",
        Exemplifies => "exemplifies",
        HasDomainRegion => "has_domain_region",
        HasDomainTopic => "has_domain_topic",
        HoloLocation => "holo_location",
        HoloMember => "holo_member",
        HoloPart => "holo_part",
        HoloPortion => "holo_portion",
        HoloSubstance => "holo_substance",
        Holonym => "holonym",
        Hypernym => "hypernym",
        Hyponym => "hyponym",
        InManner => "in_manner",
        InstanceHypernym => "instance_hypernym",
        InstanceHyponym => "instance_hyponym",
        Instrument => "instrument",
        Involved => "involved",
        InvolvedAgent => "involved_agent",
        InvolvedDirection => "involved_direction",
        InvolvedInstrument => "involved_instrument",
        InvolvedLocation => "involved_location",
        InvolvedPatient => "involved_patient",
        InvolvedResult => "involved_result",
        InvolvedSourceDirection => "involved_source_direction",
        InvolvedTargetDirection => "involved_target_direction",
        IsCausedBy => "is_caused_by",
        IsEntailedBy => "is_entailed_by",
        IsExemplifiedBy => "is_exemplified_by",
        IsSubeventOf => "is_subevent_of",
        Location => "location",
        MannerOf => "manner_of",
        MeroLocation => "mero_location",
        MeroMember => "mero_member",
        MeroPart => "mero_part",
        MeroPortion => "mero_portion",
        MeroSubstance => "mero_substance",
        Meronym => "meronym",
        Other => "other",
        Patient => "patient",
        RestrictedBy => "restricted_by",
        Restricts => "restricts",
        Result => "result",
        Role => "role",
        Similar => "similar",
        SourceDirection => "source_direction",
        StateOf => "state_of",
        Subevent => "subevent",
        TargetDirection => "target_direction",
    }
}

relation_enum! {
    /// Relation types between senses.
    SenseRelType, "sense relation type" {
        Also => "also",
        Antonym => "antonym",
        Derivation => "derivation",
        DomainRegion => "domain_region",
        DomainTopic => "domain_topic",
        Exemplifies => "exemplifies",
        HasDomainRegion => "has_domain_region",
        HasDomainTopic => "has_domain_topic",
        IsExemplifiedBy => "is_exemplified_by",
        Other => "other",
        Participle => "participle",
        Pertainym => "pertainym",
        Similar => "similar",
    }
}

impl RelationType for SynsetRelType {
    fn inverse(self) -> Option<Self> {
        use SynsetRelType::*;
        match self {
            Hypernym => Some(Hyponym),
            Hyponym => Some(Hypernym),
            InstanceHypernym => Some(InstanceHyponym),
            InstanceHyponym => Some(InstanceHypernym),
            Meronym => Some(Holonym),
            Holonym => Some(Meronym),
            MeroLocation => Some(HoloLocation),
            HoloLocation => Some(MeroLocation),
            MeroMember => Some(HoloMember),
            HoloMember => Some(MeroMember),
            MeroPart => Some(HoloPart),
            HoloPart => Some(MeroPart),
            MeroPortion => Some(HoloPortion),
            HoloPortion => Some(MeroPortion),
            MeroSubstance => Some(HoloSubstance),
            HoloSubstance => Some(MeroSubstance),
            BeInState => Some(StateOf),
            StateOf => Some(BeInState),
            Causes => Some(IsCausedBy),
            IsCausedBy => Some(Causes),
            Subevent => Some(IsSubeventOf),
            IsSubeventOf => Some(Subevent),
            MannerOf => Some(InManner),
            InManner => Some(MannerOf),
            Restricts => Some(RestrictedBy),
            RestrictedBy => Some(Restricts),
            Classifies => Some(ClassifiedBy),
            ClassifiedBy => Some(Classifies),
            Entails => Some(IsEntailedBy),
            IsEntailedBy => Some(Entails),
            DomainRegion => Some(HasDomainRegion),
            HasDomainRegion => Some(DomainRegion),
            Exemplifies => Some(IsExemplifiedBy),
            IsExemplifiedBy => Some(Exemplifies),
            Role => Some(Involved),
            Involved => Some(Role),
            Agent => Some(InvolvedAgent),
            InvolvedAgent => Some(Agent),
            Patient => Some(InvolvedPatient),
            InvolvedPatient => Some(Patient),
            Result => Some(InvolvedResult),
            InvolvedResult => Some(Result),
            Instrument => Some(InvolvedInstrument),
            InvolvedInstrument => Some(Instrument),
            Location => Some(InvolvedLocation),
            InvolvedLocation => Some(Location),
            Direction => Some(InvolvedDirection),
            InvolvedDirection => Some(Direction),
            TargetDirection => Some(InvolvedTargetDirection),
            InvolvedTargetDirection => Some(TargetDirection),
            SourceDirection => Some(InvolvedSourceDirection),
            InvolvedSourceDirection => Some(SourceDirection),
            CoAgentPatient => Some(CoPatientAgent),
            CoPatientAgent => Some(CoAgentPatient),
            CoAgentInstrument => Some(CoInstrumentAgent),
            CoInstrumentAgent => Some(CoAgentInstrument),
            CoAgentResult => Some(CoResultAgent),
            CoResultAgent => Some(CoAgentResult),
            CoPatientInstrument => Some(CoInstrumentPatient),
            CoInstrumentPatient => Some(CoPatientInstrument),
            CoResultInstrument => Some(CoInstrumentResult),
            CoInstrumentResult => Some(CoResultInstrument),
            Antonym | EqSynonym | Similar | Also | Attribute | CoRole => Some(self),
            DomainTopic | HasDomainTopic | Other => None,
        }
    }

    fn as_str(self) -> &'static str {
        self.name()
    }

    fn is_derived(self) -> bool {
        use SynsetRelType::*;
        matches!(
            self,
            Hyponym
                | InstanceHyponym
                | Holonym
                | HoloLocation
                | HoloMember
                | HoloPart
                | HoloPortion
                | HoloSubstance
                | StateOf
                | IsCausedBy
                | IsSubeventOf
                | InManner
                | RestrictedBy
                | ClassifiedBy
                | IsEntailedBy
                | HasDomainRegion
                | IsExemplifiedBy
                | Involved
                | InvolvedAgent
                | InvolvedPatient
                | InvolvedResult
                | InvolvedInstrument
                | InvolvedLocation
                | InvolvedDirection
                | InvolvedTargetDirection
                | InvolvedSourceDirection
                | CoPatientAgent
                | CoInstrumentAgent
                | CoResultAgent
                | CoInstrumentPatient
                | CoInstrumentResult
        )
    }
}

impl RelationType for SenseRelType {
    fn inverse(self) -> Option<Self> {
        use SenseRelType::*;
        match self {
            DomainRegion => Some(HasDomainRegion),
            HasDomainRegion => Some(DomainRegion),
            Exemplifies => Some(IsExemplifiedBy),
            IsExemplifiedBy => Some(Exemplifies),
            Antonym | Similar | Also | Derivation => Some(self),
            DomainTopic | HasDomainTopic | Participle | Pertainym | Other => None,
        }
    }

    fn as_str(self) -> &'static str {
        self.name()
    }

    fn is_derived(self) -> bool {
        matches!(self, SenseRelType::HasDomainRegion | SenseRelType::IsExemplifiedBy)
    }
}

/// Sub-types accepted for sense relations of type `other`.
pub const OTHER_SENSE_SUBTYPES: &[&str] = &[
    "agent",
    "material",
    "event",
    "instrument",
    "location",
    "by_means_of",
    "undergoer",
    "property",
    "result",
    "state",
    "uses",
    "destination",
    "body_part",
    "vehicle",
];

/// A typed edge from a synset to another synset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SynsetRelation {
    pub target: String,
    pub rel_type: SynsetRelType,
}

impl SynsetRelation {
    pub fn new(target: impl Into<String>, rel_type: SynsetRelType) -> Self {
        Self {
            target: target.into(),
            rel_type,
        }
    }
}

/// A typed edge from a sense to another sense.
///
/// `other_type` is only meaningful when `rel_type` is [`SenseRelType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenseRelation {
    pub target: String,
    pub rel_type: SenseRelType,
    pub other_type: Option<String>,
}

impl SenseRelation {
    pub fn new(target: impl Into<String>, rel_type: SenseRelType) -> Self {
        Self {
            target: target.into(),
            rel_type,
            other_type: None,
        }
    }
}
