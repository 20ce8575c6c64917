// src/agent/prompts.rs

use serde_json::{Value, json};

pub fn clarify(raw_request: &str) -> String {
    format!(
        r#"You are a finite-element simulation engineer preparing work for FEniCS.

Rewrite the user's request below as ONE fully specified technical paragraph.

### Cover, inferring sensible values where the request is silent:
- PDE type (heat, Navier-Stokes, elasticity, hyperelasticity, fracture, reaction-diffusion, ...), steady or transient, and any multiphysics coupling.
- Spatial dimension and domain shape, including holes, notches or imported geometry.
- Field variables, boundary conditions and initial conditions.
- Material properties (E, nu, k, rho, cp, mu, Gc, ...).
- Numerical settings: time step dt for transient problems, solver strategy (Newton, staggered), and output format (.xdmf).

### Format:
- A single paragraph of plain technical English.
- No headings, no bullet points, no markdown.

### User request:
{raw_request}
"#
    )
}

pub fn parse(clarified: &str) -> String {
    format!(
        r#"You convert a clarified FEniCS simulation specification into a JSON record for code generation.

### Fields:
- "problem_type": one of heat, fluid, elasticity, hyperelasticity, fracture, phase_field_fracture, reaction_diffusion
- "pde_description": one short sentence
- "dimension": 1, 2 or 3
- "domain": shape description
- "domain_geometry_file": file name or null
- "mesh": {{ "nx": int, "ny": int }} plus "nz" only for 3D
- "variables": list such as ["u"], ["u", "p"], ["u", "d"]
- "time_dependent", "nonlinear", "coupled": booleans
- "boundary_conditions": list of Dirichlet/Neumann conditions
- "initial_conditions": initial value per variable
- "source_terms": list, [] when none
- "material_properties": object of physical parameters
- "notes": special considerations, including dt for transient problems

Respond with the JSON object ONLY. No markdown, no commentary.

### Specification:
{clarified}
"#
    )
}

/// Shape the parser asks structured-output providers to follow.
pub fn problem_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "problem_type": { "type": "string" },
            "pde_description": { "type": "string" },
            "dimension": { "type": "integer", "minimum": 1, "maximum": 3 },
            "domain": {},
            "domain_geometry_file": { "type": ["string", "null"] },
            "mesh": { "type": "object" },
            "variables": { "type": "array", "items": { "type": "string" } },
            "time_dependent": { "type": "boolean" },
            "nonlinear": { "type": "boolean" },
            "coupled": { "type": "boolean" },
            "boundary_conditions": {},
            "initial_conditions": {},
            "source_terms": {},
            "material_properties": {},
            "notes": {}
        },
        "required": ["problem_type", "dimension", "variables", "time_dependent", "nonlinear", "coupled"]
    })
}

pub fn build_code(problem_json: &str) -> String {
    format!(
        r#"You write FEniCS (legacy dolfin) simulation scripts in Python.

You receive a JSON object with two keys: "parsed" (structured fields) and "full_text" (the full clarified specification). Use BOTH. Whenever "parsed" cannot express something (complex geometry, fiber layouts, custom materials) or is only a "fallback_text", take it from "full_text".

### Script structure:
1. Imports.
2. Geometry and mesh (built-in shapes, or Mesh('mesh.xml') with facet markers from '_facet_region.xml' when present).
3. Function spaces.
4. Boundary and initial conditions. Update time-dependent expressions with `expr.t = t`; prefer interpolate() over project().
5. Weak form F and Jacobian; solve with solver_parameters set. Transient heat uses Backward Euler: F = u*v*dx + dt*k*dot(grad(u), grad(v))*dx - u_n*v*dx.
6. A time-stepping loop when time_dependent is true, saving each step to XDMF. Phase-field fracture alternates the u and d solves.
7. Write outputs per field to .xdmf.

### Rules:
- Output ONLY the runnable Python script. No markdown fences, no explanation.
- Prefer MUMPS for nonlinear solves and add a small eps to denominators.

### Problem:
{problem_json}
"#
    )
}

pub fn diagnose(error: &str, output: &str, code: &str) -> String {
    format!(
        r#"You diagnose and repair failing FEniCS simulation scripts.

1. Read the error and the captured output.
2. Find the root cause in the original code.
3. Decide whether the code is wrong ("code") or the problem was misread upstream ("parsing").
4. Return the complete corrected script as plain Python.

### Output format (strict JSON):
{{
  "fix_type": "parsing" or "code",
  "hint": "what went wrong and how it was fixed",
  "after_code": "the full corrected Python script",
  "confidence": 0.0 to 1.0,
  "diagnoses": [ {{ "location": "line or block", "hint": "finding" }} ]
}}

### Error message:
{error}

### Simulation output:
{output}

### Original code:
{code}
"#
    )
}

pub fn diagnosis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "fix_type": { "type": "string", "enum": ["parsing", "code"] },
            "hint": { "type": "string" },
            "after_code": { "type": "string" },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
            "diagnoses": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "location": { "type": "string" },
                        "hint": { "type": "string" }
                    }
                }
            }
        },
        "required": ["fix_type", "after_code"]
    })
}

pub fn insight_report(code: &str, language: &str) -> String {
    format!(
        r#"You are a computational mechanics instructor. Explain the FEniCS script below to advanced undergraduate or graduate students.

Write the whole report in {language}.

### Sections:
1. Simulation goal: the physical problem, equations and conditions.
2. Physical concepts involved.
3. The governing PDE, term by term.
4. Code walkthrough by block: mesh, spaces, conditions, solver.
5. Critical factors: mesh resolution, time step, boundary choices.
6. Numerical stability and performance.
7. Conclusion and possible extensions or validation.
8. Recommended variations to try.

### Simulation code:
{code}
"#
    )
}
