//! Text templates driving code generation.
//!
//! A [`GeneratorProfile`] is a flat bag of strings and flags. Templates use
//! bracketed placeholders (`[CODE]`, `[INDEX]`, `[SIZE]`, `[CONDITION]`, ...)
//! which the generator substitutes. Two presets are provided; any field can be
//! overridden afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named preset a profile starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Profile {
    #[default]
    C,
    Python,
}

impl Profile {
    pub fn as_str(self) -> &'static str {
        match self {
            Profile::C => "c",
            Profile::Python => "python",
        }
    }

    /// Name used in the origin comment of generated files.
    pub fn display_name(self) -> &'static str {
        match self {
            Profile::C => "C",
            Profile::Python => "Python",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every textual decision the generator makes.
///
/// Fields suffixed `fam` apply to algebraic models and `fdm` to differential
/// ones; `woev`/`wev` select the variant without/with external variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorProfile {
    pub profile: Profile,

    pub has_interface: bool,

    // Assignment.
    pub equality_string: String,

    // Relational and logical operators.
    pub eq_string: String,
    pub neq_string: String,
    pub lt_string: String,
    pub leq_string: String,
    pub gt_string: String,
    pub geq_string: String,
    pub and_string: String,
    pub or_string: String,
    pub xor_string: String,
    pub not_string: String,

    pub has_eq_operator: bool,
    pub has_neq_operator: bool,
    pub has_lt_operator: bool,
    pub has_leq_operator: bool,
    pub has_gt_operator: bool,
    pub has_geq_operator: bool,
    pub has_and_operator: bool,
    pub has_or_operator: bool,
    pub has_xor_operator: bool,
    pub has_not_operator: bool,

    // Arithmetic operators.
    pub plus_string: String,
    pub minus_string: String,
    pub times_string: String,
    pub divide_string: String,
    pub power_string: String,
    pub square_root_string: String,
    /// Empty means squares are rendered through `power_string`.
    pub square_string: String,
    pub absolute_value_string: String,
    pub exponential_string: String,
    pub natural_logarithm_string: String,
    pub common_logarithm_string: String,
    pub ceiling_string: String,
    pub floor_string: String,
    pub min_string: String,
    pub max_string: String,
    pub rem_string: String,

    pub has_power_operator: bool,

    // Trigonometric operators.
    pub sin_string: String,
    pub cos_string: String,
    pub tan_string: String,
    pub sec_string: String,
    pub csc_string: String,
    pub cot_string: String,
    pub sinh_string: String,
    pub cosh_string: String,
    pub tanh_string: String,
    pub sech_string: String,
    pub csch_string: String,
    pub coth_string: String,
    pub asin_string: String,
    pub acos_string: String,
    pub atan_string: String,
    pub asec_string: String,
    pub acsc_string: String,
    pub acot_string: String,
    pub asinh_string: String,
    pub acosh_string: String,
    pub atanh_string: String,
    pub asech_string: String,
    pub acsch_string: String,
    pub acoth_string: String,

    // Piecewise statement.
    pub conditional_operator_if_string: String,
    pub conditional_operator_else_string: String,
    pub piecewise_if_string: String,
    pub piecewise_else_string: String,

    pub has_conditional_operator: bool,

    // Constants.
    pub true_string: String,
    pub false_string: String,
    pub e_string: String,
    pub pi_string: String,
    pub inf_string: String,
    pub nan_string: String,

    // Helper function definitions, emitted only when needed.
    pub eq_function_string: String,
    pub neq_function_string: String,
    pub lt_function_string: String,
    pub leq_function_string: String,
    pub gt_function_string: String,
    pub geq_function_string: String,
    pub and_function_string: String,
    pub or_function_string: String,
    pub xor_function_string: String,
    pub not_function_string: String,
    pub min_function_string: String,
    pub max_function_string: String,

    pub sec_function_string: String,
    pub csc_function_string: String,
    pub cot_function_string: String,
    pub sech_function_string: String,
    pub csch_function_string: String,
    pub coth_function_string: String,
    pub asec_function_string: String,
    pub acsc_function_string: String,
    pub acot_function_string: String,
    pub asech_function_string: String,
    pub acsch_function_string: String,
    pub acoth_function_string: String,

    // File boilerplate.
    pub comment_string: String,
    pub origin_comment_string: String,

    pub interface_file_name_string: String,

    pub interface_header_string: String,
    pub implementation_header_string: String,

    pub interface_version_string: String,
    pub implementation_version_string: String,

    pub interface_generator_version_string: String,
    pub implementation_generator_version_string: String,

    pub interface_state_count_string: String,
    pub implementation_state_count_string: String,

    pub interface_constant_count_string: String,
    pub implementation_constant_count_string: String,

    pub interface_computed_constant_count_string: String,
    pub implementation_computed_constant_count_string: String,

    pub interface_algebraic_count_string: String,
    pub implementation_algebraic_count_string: String,

    pub interface_external_count_string: String,
    pub implementation_external_count_string: String,

    // Variable information tables.
    pub variable_info_object_string: String,

    pub interface_voi_info_string: String,
    pub implementation_voi_info_string: String,

    pub interface_state_info_string: String,
    pub implementation_state_info_string: String,

    pub interface_constant_info_string: String,
    pub implementation_constant_info_string: String,

    pub interface_computed_constant_info_string: String,
    pub implementation_computed_constant_info_string: String,

    pub interface_algebraic_info_string: String,
    pub implementation_algebraic_info_string: String,

    pub interface_external_info_string: String,
    pub implementation_external_info_string: String,

    pub variable_info_entry_string: String,

    // Arrays.
    pub voi_string: String,

    pub states_array_string: String,
    pub rates_array_string: String,
    pub constants_array_string: String,
    pub computed_constants_array_string: String,
    pub algebraic_array_string: String,
    pub externals_array_string: String,

    // External variables.
    pub external_variable_method_type_definition_fam_string: String,
    pub external_variable_method_type_definition_fdm_string: String,

    pub external_variable_method_call_fam_string: String,
    pub external_variable_method_call_fdm_string: String,

    // Root finding.
    pub root_finding_info_object_fam_string: String,
    pub root_finding_info_object_fdm_string: String,
    pub extern_nla_solve_method_string: String,
    pub find_root_call_fam_string: String,
    pub find_root_call_fdm_string: String,
    pub find_root_method_fam_string: String,
    pub find_root_method_fdm_string: String,
    pub nla_solve_call_fam_string: String,
    pub nla_solve_call_fdm_string: String,
    pub objective_function_method_fam_string: String,
    pub objective_function_method_fdm_string: String,
    pub u_array_string: String,
    pub f_array_string: String,

    // Array creation and deletion.
    pub interface_create_states_array_method_string: String,
    pub implementation_create_states_array_method_string: String,

    pub interface_create_constants_array_method_string: String,
    pub implementation_create_constants_array_method_string: String,

    pub interface_create_computed_constants_array_method_string: String,
    pub implementation_create_computed_constants_array_method_string: String,

    pub interface_create_algebraic_array_method_string: String,
    pub implementation_create_algebraic_array_method_string: String,

    pub interface_create_externals_array_method_string: String,
    pub implementation_create_externals_array_method_string: String,

    pub interface_delete_array_method_string: String,
    pub implementation_delete_array_method_string: String,

    // Model methods.
    pub interface_initialise_variables_method_fam_string: String,
    pub implementation_initialise_variables_method_fam_string: String,

    pub interface_initialise_variables_method_fdm_string: String,
    pub implementation_initialise_variables_method_fdm_string: String,

    pub interface_compute_computed_constants_method_string: String,
    pub implementation_compute_computed_constants_method_string: String,

    pub interface_compute_rates_method_woev_string: String,
    pub implementation_compute_rates_method_woev_string: String,

    pub interface_compute_rates_method_wev_string: String,
    pub implementation_compute_rates_method_wev_string: String,

    pub interface_compute_variables_method_fam_woev_string: String,
    pub implementation_compute_variables_method_fam_woev_string: String,

    pub interface_compute_variables_method_fam_wev_string: String,
    pub implementation_compute_variables_method_fam_wev_string: String,

    pub interface_compute_variables_method_fdm_woev_string: String,
    pub implementation_compute_variables_method_fdm_woev_string: String,

    pub interface_compute_variables_method_fdm_wev_string: String,
    pub implementation_compute_variables_method_fdm_wev_string: String,

    // Layout.
    pub empty_method_string: String,
    pub indent_string: String,

    pub open_array_initialiser_string: String,
    pub close_array_initialiser_string: String,

    pub open_array_string: String,
    pub close_array_string: String,

    pub array_element_separator_string: String,
    pub string_delimiter_string: String,
    pub command_separator_string: String,
}

impl Default for GeneratorProfile {
    fn default() -> Self {
        Self::c()
    }
}

fn s(text: &str) -> String {
    text.to_string()
}

impl GeneratorProfile {
    pub fn new(profile: Profile) -> Self {
        match profile {
            Profile::C => Self::c(),
            Profile::Python => Self::python(),
        }
    }

    /// Reloads every field from `profile`, discarding overrides.
    pub fn set_profile(&mut self, profile: Profile) {
        *self = Self::new(profile);
    }

    /// Whether some field differs from the preset this profile started from.
    pub fn is_modified(&self) -> bool {
        *self != Self::new(self.profile)
    }

    /// Template for a piecewise branch, honouring `has_conditional_operator`.
    pub fn piecewise_if(&self) -> &str {
        if self.has_conditional_operator {
            &self.conditional_operator_if_string
        } else {
            &self.piecewise_if_string
        }
    }

    pub fn piecewise_else(&self) -> &str {
        if self.has_conditional_operator {
            &self.conditional_operator_else_string
        } else {
            &self.piecewise_else_string
        }
    }

    pub fn c() -> Self {
        Self {
            profile: Profile::C,

            has_interface: true,

            equality_string: s(" = "),

            eq_string: s(" == "),
            neq_string: s(" != "),
            lt_string: s(" < "),
            leq_string: s(" <= "),
            gt_string: s(" > "),
            geq_string: s(" >= "),
            and_string: s(" && "),
            or_string: s(" || "),
            xor_string: s("xor"),
            not_string: s("!"),

            has_eq_operator: true,
            has_neq_operator: true,
            has_lt_operator: true,
            has_leq_operator: true,
            has_gt_operator: true,
            has_geq_operator: true,
            has_and_operator: true,
            has_or_operator: true,
            has_xor_operator: false,
            has_not_operator: true,

            plus_string: s("+"),
            minus_string: s("-"),
            times_string: s("*"),
            divide_string: s("/"),
            power_string: s("pow"),
            square_root_string: s("sqrt"),
            square_string: s(""),
            absolute_value_string: s("fabs"),
            exponential_string: s("exp"),
            natural_logarithm_string: s("log"),
            common_logarithm_string: s("log10"),
            ceiling_string: s("ceil"),
            floor_string: s("floor"),
            min_string: s("min"),
            max_string: s("max"),
            rem_string: s("fmod"),

            has_power_operator: false,

            sin_string: s("sin"),
            cos_string: s("cos"),
            tan_string: s("tan"),
            sec_string: s("sec"),
            csc_string: s("csc"),
            cot_string: s("cot"),
            sinh_string: s("sinh"),
            cosh_string: s("cosh"),
            tanh_string: s("tanh"),
            sech_string: s("sech"),
            csch_string: s("csch"),
            coth_string: s("coth"),
            asin_string: s("asin"),
            acos_string: s("acos"),
            atan_string: s("atan"),
            asec_string: s("asec"),
            acsc_string: s("acsc"),
            acot_string: s("acot"),
            asinh_string: s("asinh"),
            acosh_string: s("acosh"),
            atanh_string: s("atanh"),
            asech_string: s("asech"),
            acsch_string: s("acsch"),
            acoth_string: s("acoth"),

            conditional_operator_if_string: s("([CONDITION])?[IF_STATEMENT]"),
            conditional_operator_else_string: s(":[ELSE_STATEMENT]"),
            piecewise_if_string: s("piecewise([CONDITION], [IF_STATEMENT]"),
            piecewise_else_string: s(", [ELSE_STATEMENT])"),

            has_conditional_operator: true,

            true_string: s("1.0"),
            false_string: s("0.0"),
            e_string: s("2.71828182845905"),
            pi_string: s("3.14159265358979"),
            inf_string: s("INFINITY"),
            nan_string: s("NAN"),

            eq_function_string: s(""),
            neq_function_string: s(""),
            lt_function_string: s(""),
            leq_function_string: s(""),
            gt_function_string: s(""),
            geq_function_string: s(""),
            and_function_string: s(""),
            or_function_string: s(""),
            xor_function_string: s("double xor(double x, double y)\n\
                                    {\n    \
                                        return (x != 0.0) ^ (y != 0.0);\n\
                                    }\n"),
            not_function_string: s(""),
            min_function_string: s("double min(double x, double y)\n\
                                    {\n    \
                                        return (x < y)?x:y;\n\
                                    }\n"),
            max_function_string: s("double max(double x, double y)\n\
                                    {\n    \
                                        return (x > y)?x:y;\n\
                                    }\n"),

            sec_function_string: s("double sec(double x)\n{\n    return 1.0/cos(x);\n}\n"),
            csc_function_string: s("double csc(double x)\n{\n    return 1.0/sin(x);\n}\n"),
            cot_function_string: s("double cot(double x)\n{\n    return 1.0/tan(x);\n}\n"),
            sech_function_string: s("double sech(double x)\n{\n    return 1.0/cosh(x);\n}\n"),
            csch_function_string: s("double csch(double x)\n{\n    return 1.0/sinh(x);\n}\n"),
            coth_function_string: s("double coth(double x)\n{\n    return 1.0/tanh(x);\n}\n"),
            asec_function_string: s("double asec(double x)\n{\n    return acos(1.0/x);\n}\n"),
            acsc_function_string: s("double acsc(double x)\n{\n    return asin(1.0/x);\n}\n"),
            acot_function_string: s("double acot(double x)\n{\n    return atan(1.0/x);\n}\n"),
            asech_function_string: s("double asech(double x)\n\
                                      {\n    \
                                          double oneOverX = 1.0/x;\n\n    \
                                          return log(oneOverX+sqrt(oneOverX*oneOverX-1.0));\n\
                                      }\n"),
            acsch_function_string: s("double acsch(double x)\n\
                                      {\n    \
                                          double oneOverX = 1.0/x;\n\n    \
                                          return log(oneOverX+sqrt(oneOverX*oneOverX+1.0));\n\
                                      }\n"),
            acoth_function_string: s("double acoth(double x)\n\
                                      {\n    \
                                          double oneOverX = 1.0/x;\n\n    \
                                          return 0.5*log((1.0+oneOverX)/(1.0-oneOverX));\n\
                                      }\n"),

            comment_string: s("/* [CODE] */\n"),
            origin_comment_string: s(
                "The content of this file was generated using [PROFILE_INFORMATION] modelgen [GENERATOR_VERSION].",
            ),

            interface_file_name_string: s("model.h"),

            interface_header_string: s("#pragma once\n\n#include <stddef.h>\n"),
            implementation_header_string: s(
                "#include \"[INTERFACE_FILE_NAME]\"\n\n#include <math.h>\n#include <stdlib.h>\n",
            ),

            interface_version_string: s("extern const char VERSION[];\n"),
            implementation_version_string: s("const char VERSION[] = \"0.6.0\";\n"),

            interface_generator_version_string: s("extern const char GENERATOR_VERSION[];\n"),
            implementation_generator_version_string: s(
                "const char GENERATOR_VERSION[] = \"[GENERATOR_VERSION]\";\n",
            ),

            interface_state_count_string: s("extern const size_t STATE_COUNT;\n"),
            implementation_state_count_string: s("const size_t STATE_COUNT = [STATE_COUNT];\n"),

            interface_constant_count_string: s("extern const size_t CONSTANT_COUNT;\n"),
            implementation_constant_count_string: s("const size_t CONSTANT_COUNT = [CONSTANT_COUNT];\n"),

            interface_computed_constant_count_string: s("extern const size_t COMPUTED_CONSTANT_COUNT;\n"),
            implementation_computed_constant_count_string: s(
                "const size_t COMPUTED_CONSTANT_COUNT = [COMPUTED_CONSTANT_COUNT];\n",
            ),

            interface_algebraic_count_string: s("extern const size_t ALGEBRAIC_COUNT;\n"),
            implementation_algebraic_count_string: s("const size_t ALGEBRAIC_COUNT = [ALGEBRAIC_COUNT];\n"),

            interface_external_count_string: s("extern const size_t EXTERNAL_COUNT;\n"),
            implementation_external_count_string: s("const size_t EXTERNAL_COUNT = [EXTERNAL_COUNT];\n"),

            variable_info_object_string: s("typedef struct {\n    \
                                              char name[[NAME_SIZE]];\n    \
                                              char units[[UNITS_SIZE]];\n    \
                                              char component[[COMPONENT_SIZE]];\n\
                                            } VariableInfo;\n"),

            interface_voi_info_string: s("extern const VariableInfo VOI_INFO;\n"),
            implementation_voi_info_string: s("const VariableInfo VOI_INFO = [CODE];\n"),

            interface_state_info_string: s("extern const VariableInfo STATE_INFO[];\n"),
            implementation_state_info_string: s("const VariableInfo STATE_INFO[] = {\n[CODE]};\n"),

            interface_constant_info_string: s("extern const VariableInfo CONSTANT_INFO[];\n"),
            implementation_constant_info_string: s("const VariableInfo CONSTANT_INFO[] = {\n[CODE]};\n"),

            interface_computed_constant_info_string: s("extern const VariableInfo COMPUTED_CONSTANT_INFO[];\n"),
            implementation_computed_constant_info_string: s(
                "const VariableInfo COMPUTED_CONSTANT_INFO[] = {\n[CODE]};\n",
            ),

            interface_algebraic_info_string: s("extern const VariableInfo ALGEBRAIC_INFO[];\n"),
            implementation_algebraic_info_string: s("const VariableInfo ALGEBRAIC_INFO[] = {\n[CODE]};\n"),

            interface_external_info_string: s("extern const VariableInfo EXTERNAL_INFO[];\n"),
            implementation_external_info_string: s("const VariableInfo EXTERNAL_INFO[] = {\n[CODE]};\n"),

            variable_info_entry_string: s("{\"[NAME]\", \"[UNITS]\", \"[COMPONENT]\"}"),

            voi_string: s("voi"),

            states_array_string: s("states"),
            rates_array_string: s("rates"),
            constants_array_string: s("constants"),
            computed_constants_array_string: s("computedConstants"),
            algebraic_array_string: s("algebraic"),
            externals_array_string: s("externals"),

            external_variable_method_type_definition_fam_string: s(
                "typedef double (* ExternalVariable)(double *constants, double *computedConstants, \
                 double *algebraic, double *externals, size_t index);\n",
            ),
            external_variable_method_type_definition_fdm_string: s(
                "typedef double (* ExternalVariable)(double voi, double *states, double *rates, \
                 double *constants, double *computedConstants, double *algebraic, double *externals, \
                 size_t index);\n",
            ),

            external_variable_method_call_fam_string: s(
                "externalVariable(constants, computedConstants, algebraic, externals, [INDEX])",
            ),
            external_variable_method_call_fdm_string: s(
                "externalVariable(voi, states, rates, constants, computedConstants, algebraic, externals, [INDEX])",
            ),

            root_finding_info_object_fam_string: s("typedef struct {\n    \
                                                      double *constants;\n    \
                                                      double *computedConstants;\n    \
                                                      double *algebraic;\n    \
                                                      double *externals;\n\
                                                    } RootFindingInfo;\n"),
            root_finding_info_object_fdm_string: s("typedef struct {\n    \
                                                      double voi;\n    \
                                                      double *states;\n    \
                                                      double *rates;\n    \
                                                      double *constants;\n    \
                                                      double *computedConstants;\n    \
                                                      double *algebraic;\n    \
                                                      double *externals;\n\
                                                    } RootFindingInfo;\n"),
            extern_nla_solve_method_string: s(
                "extern void nlaSolve(void (*objectiveFunction)(double *, double *, void *),\n                     \
                 double *u, size_t n, void *data);\n",
            ),
            find_root_call_fam_string: s("findRoot[INDEX](constants, computedConstants, algebraic, externals);\n"),
            find_root_call_fdm_string: s(
                "findRoot[INDEX](voi, states, rates, constants, computedConstants, algebraic, externals);\n",
            ),
            find_root_method_fam_string: s(
                "void findRoot[INDEX](double *constants, double *computedConstants, double *algebraic, \
                 double *externals)\n\
                 {\n    \
                     RootFindingInfo rfi = { constants, computedConstants, algebraic, externals };\n    \
                     double u[[SIZE]];\n\n\
                 [CODE]\
                 }\n",
            ),
            find_root_method_fdm_string: s(
                "void findRoot[INDEX](double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals)\n\
                 {\n    \
                     RootFindingInfo rfi = { voi, states, rates, constants, computedConstants, algebraic, externals };\n    \
                     double u[[SIZE]];\n\n\
                 [CODE]\
                 }\n",
            ),
            nla_solve_call_fam_string: s("nlaSolve(objectiveFunction[INDEX], u, [SIZE], &rfi);\n"),
            nla_solve_call_fdm_string: s("nlaSolve(objectiveFunction[INDEX], u, [SIZE], &rfi);\n"),
            objective_function_method_fam_string: s(
                "void objectiveFunction[INDEX](double *u, double *f, void *data)\n\
                 {\n    \
                     double *constants = ((RootFindingInfo *) data)->constants;\n    \
                     double *computedConstants = ((RootFindingInfo *) data)->computedConstants;\n    \
                     double *algebraic = ((RootFindingInfo *) data)->algebraic;\n    \
                     double *externals = ((RootFindingInfo *) data)->externals;\n\n\
                 [CODE]\
                 }\n",
            ),
            objective_function_method_fdm_string: s(
                "void objectiveFunction[INDEX](double *u, double *f, void *data)\n\
                 {\n    \
                     double voi = ((RootFindingInfo *) data)->voi;\n    \
                     double *states = ((RootFindingInfo *) data)->states;\n    \
                     double *rates = ((RootFindingInfo *) data)->rates;\n    \
                     double *constants = ((RootFindingInfo *) data)->constants;\n    \
                     double *computedConstants = ((RootFindingInfo *) data)->computedConstants;\n    \
                     double *algebraic = ((RootFindingInfo *) data)->algebraic;\n    \
                     double *externals = ((RootFindingInfo *) data)->externals;\n\n\
                 [CODE]\
                 }\n",
            ),
            u_array_string: s("u"),
            f_array_string: s("f"),

            interface_create_states_array_method_string: s("double * createStatesArray();\n"),
            implementation_create_states_array_method_string: c_create_array("States", "STATE_COUNT"),

            interface_create_constants_array_method_string: s("double * createConstantsArray();\n"),
            implementation_create_constants_array_method_string: c_create_array("Constants", "CONSTANT_COUNT"),

            interface_create_computed_constants_array_method_string: s(
                "double * createComputedConstantsArray();\n",
            ),
            implementation_create_computed_constants_array_method_string: c_create_array(
                "ComputedConstants",
                "COMPUTED_CONSTANT_COUNT",
            ),

            interface_create_algebraic_array_method_string: s("double * createAlgebraicArray();\n"),
            implementation_create_algebraic_array_method_string: c_create_array("Algebraic", "ALGEBRAIC_COUNT"),

            interface_create_externals_array_method_string: s("double * createExternalsArray();\n"),
            implementation_create_externals_array_method_string: c_create_array("Externals", "EXTERNAL_COUNT"),

            interface_delete_array_method_string: s("void deleteArray(double *array);\n"),
            implementation_delete_array_method_string: s("void deleteArray(double *array)\n{\n    free(array);\n}\n"),

            interface_initialise_variables_method_fam_string: s(
                "void initialiseVariables(double *constants, double *algebraic);\n",
            ),
            implementation_initialise_variables_method_fam_string: c_method(
                "void initialiseVariables(double *constants, double *algebraic)",
            ),

            interface_initialise_variables_method_fdm_string: s(
                "void initialiseVariables(double *states, double *constants, double *algebraic);\n",
            ),
            implementation_initialise_variables_method_fdm_string: c_method(
                "void initialiseVariables(double *states, double *constants, double *algebraic)",
            ),

            interface_compute_computed_constants_method_string: s(
                "void computeComputedConstants(double *constants, double *computedConstants);\n",
            ),
            implementation_compute_computed_constants_method_string: c_method(
                "void computeComputedConstants(double *constants, double *computedConstants)",
            ),

            interface_compute_rates_method_woev_string: s(
                "void computeRates(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals);\n",
            ),
            implementation_compute_rates_method_woev_string: c_method(
                "void computeRates(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals)",
            ),

            interface_compute_rates_method_wev_string: s(
                "void computeRates(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals, \
                 ExternalVariable externalVariable);\n",
            ),
            implementation_compute_rates_method_wev_string: c_method(
                "void computeRates(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals, \
                 ExternalVariable externalVariable)",
            ),

            interface_compute_variables_method_fam_woev_string: s(
                "void computeVariables(double *constants, double *computedConstants, double *algebraic, \
                 double *externals);\n",
            ),
            implementation_compute_variables_method_fam_woev_string: c_method(
                "void computeVariables(double *constants, double *computedConstants, double *algebraic, \
                 double *externals)",
            ),

            interface_compute_variables_method_fam_wev_string: s(
                "void computeVariables(double *constants, double *computedConstants, double *algebraic, \
                 double *externals, ExternalVariable externalVariable);\n",
            ),
            implementation_compute_variables_method_fam_wev_string: c_method(
                "void computeVariables(double *constants, double *computedConstants, double *algebraic, \
                 double *externals, ExternalVariable externalVariable)",
            ),

            interface_compute_variables_method_fdm_woev_string: s(
                "void computeVariables(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals);\n",
            ),
            implementation_compute_variables_method_fdm_woev_string: c_method(
                "void computeVariables(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals)",
            ),

            interface_compute_variables_method_fdm_wev_string: s(
                "void computeVariables(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals, \
                 ExternalVariable externalVariable);\n",
            ),
            implementation_compute_variables_method_fdm_wev_string: c_method(
                "void computeVariables(double voi, double *states, double *rates, double *constants, \
                 double *computedConstants, double *algebraic, double *externals, \
                 ExternalVariable externalVariable)",
            ),

            empty_method_string: s(""),
            indent_string: s("    "),

            open_array_initialiser_string: s("{"),
            close_array_initialiser_string: s("}"),

            open_array_string: s("["),
            close_array_string: s("]"),

            array_element_separator_string: s(","),
            string_delimiter_string: s("\""),
            command_separator_string: s(";"),
        }
    }

    pub fn python() -> Self {
        Self {
            profile: Profile::Python,

            has_interface: false,

            eq_string: s("eq_func"),
            neq_string: s("neq_func"),
            lt_string: s("lt_func"),
            leq_string: s("leq_func"),
            gt_string: s("gt_func"),
            geq_string: s("geq_func"),
            and_string: s("and_func"),
            or_string: s("or_func"),
            xor_string: s("xor_func"),
            not_string: s("not_func"),

            has_eq_operator: false,
            has_neq_operator: false,
            has_lt_operator: false,
            has_leq_operator: false,
            has_gt_operator: false,
            has_geq_operator: false,
            has_and_operator: false,
            has_or_operator: false,
            has_xor_operator: false,
            has_not_operator: false,

            conditional_operator_if_string: s("[IF_STATEMENT] if [CONDITION]"),
            conditional_operator_else_string: s(" else [ELSE_STATEMENT]"),

            inf_string: s("inf"),
            nan_string: s("nan"),

            eq_function_string: py_relational("eq_func", "x == y"),
            neq_function_string: py_relational("neq_func", "x != y"),
            lt_function_string: py_relational("lt_func", "x < y"),
            leq_function_string: py_relational("leq_func", "x <= y"),
            gt_function_string: py_relational("gt_func", "x > y"),
            geq_function_string: py_relational("geq_func", "x >= y"),
            and_function_string: py_relational("and_func", "bool(x) & bool(y)"),
            or_function_string: py_relational("or_func", "bool(x) | bool(y)"),
            xor_function_string: py_relational("xor_func", "bool(x) ^ bool(y)"),
            not_function_string: s("\ndef not_func(x):\n    return 1.0 if not bool(x) else 0.0\n"),
            min_function_string: s("\ndef min(x, y):\n    return x if x < y else y\n"),
            max_function_string: s("\ndef max(x, y):\n    return x if x > y else y\n"),

            sec_function_string: py_function("sec", "1.0/cos(x)"),
            csc_function_string: py_function("csc", "1.0/sin(x)"),
            cot_function_string: py_function("cot", "1.0/tan(x)"),
            sech_function_string: py_function("sech", "1.0/cosh(x)"),
            csch_function_string: py_function("csch", "1.0/sinh(x)"),
            coth_function_string: py_function("coth", "1.0/tanh(x)"),
            asec_function_string: py_function("asec", "acos(1.0/x)"),
            acsc_function_string: py_function("acsc", "asin(1.0/x)"),
            acot_function_string: py_function("acot", "atan(1.0/x)"),
            asech_function_string: py_reciprocal_function(
                "asech",
                "log(one_over_x+sqrt(one_over_x*one_over_x-1.0))",
            ),
            acsch_function_string: py_reciprocal_function(
                "acsch",
                "log(one_over_x+sqrt(one_over_x*one_over_x+1.0))",
            ),
            acoth_function_string: py_reciprocal_function(
                "acoth",
                "0.5*log((1.0+one_over_x)/(1.0-one_over_x))",
            ),

            comment_string: s("# [CODE]\n"),

            interface_file_name_string: s(""),

            interface_header_string: s(""),
            implementation_header_string: s("from math import *\n"),

            interface_version_string: s(""),
            implementation_version_string: s("__version__ = \"0.5.0\"\n"),

            interface_generator_version_string: s(""),
            implementation_generator_version_string: s("GENERATOR_VERSION = \"[GENERATOR_VERSION]\"\n"),

            interface_state_count_string: s(""),
            implementation_state_count_string: s("STATE_COUNT = [STATE_COUNT]\n"),

            interface_constant_count_string: s(""),
            implementation_constant_count_string: s("CONSTANT_COUNT = [CONSTANT_COUNT]\n"),

            interface_computed_constant_count_string: s(""),
            implementation_computed_constant_count_string: s(
                "COMPUTED_CONSTANT_COUNT = [COMPUTED_CONSTANT_COUNT]\n",
            ),

            interface_algebraic_count_string: s(""),
            implementation_algebraic_count_string: s("ALGEBRAIC_COUNT = [ALGEBRAIC_COUNT]\n"),

            interface_external_count_string: s(""),
            implementation_external_count_string: s("EXTERNAL_COUNT = [EXTERNAL_COUNT]\n"),

            variable_info_object_string: s(""),

            interface_voi_info_string: s(""),
            implementation_voi_info_string: s("VOI_INFO = [CODE]\n"),

            interface_state_info_string: s(""),
            implementation_state_info_string: s("STATE_INFO = [\n[CODE]]\n"),

            interface_constant_info_string: s(""),
            implementation_constant_info_string: s("CONSTANT_INFO = [\n[CODE]]\n"),

            interface_computed_constant_info_string: s(""),
            implementation_computed_constant_info_string: s("COMPUTED_CONSTANT_INFO = [\n[CODE]]\n"),

            interface_algebraic_info_string: s(""),
            implementation_algebraic_info_string: s("ALGEBRAIC_INFO = [\n[CODE]]\n"),

            interface_external_info_string: s(""),
            implementation_external_info_string: s("EXTERNAL_INFO = [\n[CODE]]\n"),

            variable_info_entry_string: s(
                "{\"name\": \"[NAME]\", \"units\": \"[UNITS]\", \"component\": \"[COMPONENT]\"}",
            ),

            computed_constants_array_string: s("computed_constants"),

            external_variable_method_type_definition_fam_string: s(""),
            external_variable_method_type_definition_fdm_string: s(""),

            external_variable_method_call_fam_string: s(
                "external_variable(constants, computed_constants, algebraic, externals, [INDEX])",
            ),
            external_variable_method_call_fdm_string: s(
                "external_variable(voi, states, rates, constants, computed_constants, algebraic, externals, [INDEX])",
            ),

            root_finding_info_object_fam_string: s(""),
            root_finding_info_object_fdm_string: s(""),
            extern_nla_solve_method_string: s("from nlasolver import nla_solve\n"),
            find_root_call_fam_string: s("find_root_[INDEX](constants, computed_constants, algebraic, externals)\n"),
            find_root_call_fdm_string: s(
                "find_root_[INDEX](voi, states, rates, constants, computed_constants, algebraic, externals)\n",
            ),
            find_root_method_fam_string: s(
                "\ndef find_root_[INDEX](constants, computed_constants, algebraic, externals):\n    \
                 u = [nan]*[SIZE]\n\n\
                 [CODE]",
            ),
            find_root_method_fdm_string: s(
                "\ndef find_root_[INDEX](voi, states, rates, constants, computed_constants, algebraic, externals):\n    \
                 u = [nan]*[SIZE]\n\n\
                 [CODE]",
            ),
            nla_solve_call_fam_string: s(
                "u = nla_solve(objective_function_[INDEX], u, [SIZE], \
                 [constants, computed_constants, algebraic, externals])\n",
            ),
            nla_solve_call_fdm_string: s(
                "u = nla_solve(objective_function_[INDEX], u, [SIZE], \
                 [voi, states, rates, constants, computed_constants, algebraic, externals])\n",
            ),
            objective_function_method_fam_string: s(
                "\ndef objective_function_[INDEX](u, f, data):\n    \
                 constants = data[0]\n    \
                 computed_constants = data[1]\n    \
                 algebraic = data[2]\n    \
                 externals = data[3]\n\n\
                 [CODE]",
            ),
            objective_function_method_fdm_string: s(
                "\ndef objective_function_[INDEX](u, f, data):\n    \
                 voi = data[0]\n    \
                 states = data[1]\n    \
                 rates = data[2]\n    \
                 constants = data[3]\n    \
                 computed_constants = data[4]\n    \
                 algebraic = data[5]\n    \
                 externals = data[6]\n\n\
                 [CODE]",
            ),

            interface_create_states_array_method_string: s(""),
            implementation_create_states_array_method_string: py_create_array("states", "STATE_COUNT"),

            interface_create_constants_array_method_string: s(""),
            implementation_create_constants_array_method_string: py_create_array("constants", "CONSTANT_COUNT"),

            interface_create_computed_constants_array_method_string: s(""),
            implementation_create_computed_constants_array_method_string: py_create_array(
                "computed_constants",
                "COMPUTED_CONSTANT_COUNT",
            ),

            interface_create_algebraic_array_method_string: s(""),
            implementation_create_algebraic_array_method_string: py_create_array("algebraic", "ALGEBRAIC_COUNT"),

            interface_create_externals_array_method_string: s(""),
            implementation_create_externals_array_method_string: py_create_array("externals", "EXTERNAL_COUNT"),

            interface_delete_array_method_string: s(""),
            implementation_delete_array_method_string: s(""),

            interface_initialise_variables_method_fam_string: s(""),
            implementation_initialise_variables_method_fam_string: py_method(
                "initialise_variables(constants, algebraic)",
            ),

            interface_initialise_variables_method_fdm_string: s(""),
            implementation_initialise_variables_method_fdm_string: py_method(
                "initialise_variables(states, constants, algebraic)",
            ),

            interface_compute_computed_constants_method_string: s(""),
            implementation_compute_computed_constants_method_string: py_method(
                "compute_computed_constants(constants, computed_constants)",
            ),

            interface_compute_rates_method_woev_string: s(""),
            implementation_compute_rates_method_woev_string: py_method(
                "compute_rates(voi, states, rates, constants, computed_constants, algebraic, externals)",
            ),

            interface_compute_rates_method_wev_string: s(""),
            implementation_compute_rates_method_wev_string: py_method(
                "compute_rates(voi, states, rates, constants, computed_constants, algebraic, externals, \
                 external_variable)",
            ),

            interface_compute_variables_method_fam_woev_string: s(""),
            implementation_compute_variables_method_fam_woev_string: py_method(
                "compute_variables(constants, computed_constants, algebraic, externals)",
            ),

            interface_compute_variables_method_fam_wev_string: s(""),
            implementation_compute_variables_method_fam_wev_string: py_method(
                "compute_variables(constants, computed_constants, algebraic, externals, external_variable)",
            ),

            interface_compute_variables_method_fdm_woev_string: s(""),
            implementation_compute_variables_method_fdm_woev_string: py_method(
                "compute_variables(voi, states, rates, constants, computed_constants, algebraic, externals)",
            ),

            interface_compute_variables_method_fdm_wev_string: s(""),
            implementation_compute_variables_method_fdm_wev_string: py_method(
                "compute_variables(voi, states, rates, constants, computed_constants, algebraic, externals, \
                 external_variable)",
            ),

            empty_method_string: s("pass\n"),

            open_array_initialiser_string: s("["),
            close_array_initialiser_string: s("]"),

            command_separator_string: s(""),

            ..Self::c()
        }
    }
}

fn c_method(signature: &str) -> String {
    format!("{signature}\n{{\n[CODE]}}\n")
}

fn c_create_array(name: &str, count: &str) -> String {
    format!(
        "double * create{name}Array()\n\
         {{\n    \
             double *res = (double *) malloc({count}*sizeof(double));\n\n    \
             for (size_t i = 0; i < {count}; ++i) {{\n        \
                 res[i] = NAN;\n    \
             }}\n\n    \
             return res;\n\
         }}\n"
    )
}

fn py_method(signature: &str) -> String {
    format!("\ndef {signature}:\n[CODE]")
}

fn py_create_array(name: &str, count: &str) -> String {
    format!("\ndef create_{name}_array():\n    return [nan]*{count}\n")
}

fn py_relational(name: &str, test: &str) -> String {
    format!("\ndef {name}(x, y):\n    return 1.0 if {test} else 0.0\n")
}

fn py_function(name: &str, body: &str) -> String {
    format!("\ndef {name}(x):\n    return {body}\n")
}

fn py_reciprocal_function(name: &str, body: &str) -> String {
    format!("\ndef {name}(x):\n    one_over_x = 1.0/x\n\n    return {body}\n")
}
